//! Cross-reference table: object number -> location mapping plus trailer.
//!
//! Tables form a layered chain: every incremental update contributes one
//! layer, and `merge_up` folds an older layer underneath a newer one. The
//! table itself is policy-free - which entry survives a conflict between
//! chain layers is decided by the loaders in `document::parser`.

use crate::model::Dict;
use std::collections::BTreeMap;

/// Upper bound on object numbers. Theoretical limits are higher, but this
/// is large enough in practice and bounds resource use on hostile input.
pub const MAX_OBJECT_NUMBER: u32 = 1 << 23;

/// Upper bound on the declared cross-reference table size.
pub const MAX_XREF_SIZE: u32 = 1_048_576;

/// Location/state of one object number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectInfo {
    /// Object number currently unused.
    Free,
    /// Stored at an absolute byte offset.
    Normal { genno: u32, pos: u64 },
    /// A container stream, also stored at a byte offset. Distinguished
    /// from `Normal` only so the resolver knows it can be opened as an
    /// object-stream archive.
    ObjStream { pos: u64 },
    /// Stored inside an archive object stream, at a zero-based index.
    Compressed { archive: u32, index: u32 },
    /// Unset sentinel. Plants the declared table size during loads and
    /// arms the stream-loader's fill-if-unset rule; never a valid terminal
    /// state for resolution.
    Null,
}

/// One layer (or the merged result) of the cross-reference chain.
#[derive(Debug, Default)]
pub struct XrefTable {
    objects: BTreeMap<u32, ObjectInfo>,
    trailer: Option<Dict>,
    /// Object number owning the trailer; 0 for inline `trailer` keywords.
    trailer_objnum: u32,
}

impl XrefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trailer(trailer: Dict, trailer_objnum: u32) -> Self {
        Self {
            objects: BTreeMap::new(),
            trailer: Some(trailer),
            trailer_objnum,
        }
    }

    pub fn trailer(&self) -> Option<&Dict> {
        self.trailer.as_ref()
    }

    pub fn trailer_objnum(&self) -> u32 {
        self.trailer_objnum
    }

    pub fn set_trailer(&mut self, trailer: Dict, trailer_objnum: u32) {
        self.trailer = Some(trailer);
        self.trailer_objnum = trailer_objnum;
    }

    /// Raw entry lookup. May surface the `Null` sentinel; public document
    /// queries translate that to "absent".
    pub fn get(&self, objnum: u32) -> Option<&ObjectInfo> {
        self.objects.get(&objnum)
    }

    /// Highest known object number (0 when empty).
    pub fn last_objnum(&self) -> u32 {
        self.objects.keys().next_back().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ObjectInfo)> {
        self.objects.iter().map(|(k, v)| (*k, v))
    }

    /// Register an object stored at a byte offset. Later calls for the
    /// same object number overwrite earlier ones; an `ObjStream` tag is
    /// preserved (position updated) so archives stay recognizable.
    pub fn add_normal(&mut self, objnum: u32, genno: u32, pos: u64) {
        if objnum >= MAX_OBJECT_NUMBER {
            return;
        }
        let info = match self.objects.get(&objnum) {
            Some(ObjectInfo::ObjStream { .. }) => ObjectInfo::ObjStream { pos },
            _ => ObjectInfo::Normal { genno, pos },
        };
        self.objects.insert(objnum, info);
    }

    /// Register an object stored inside an archive object stream. The
    /// archive itself is tagged `ObjStream` (keeping any position already
    /// known for it) so the resolver can open it.
    pub fn add_compressed(&mut self, objnum: u32, archive: u32, index: u32) {
        if objnum >= MAX_OBJECT_NUMBER || archive >= MAX_OBJECT_NUMBER {
            return;
        }
        self.objects
            .insert(objnum, ObjectInfo::Compressed { archive, index });

        let archive_info = match self.objects.get(&archive) {
            Some(ObjectInfo::Normal { pos, .. }) | Some(ObjectInfo::ObjStream { pos }) => {
                ObjectInfo::ObjStream { pos: *pos }
            }
            _ => ObjectInfo::ObjStream { pos: 0 },
        };
        self.objects.insert(archive, archive_info);
    }

    /// Mark an object number free.
    pub fn set_free(&mut self, objnum: u32) {
        if objnum >= MAX_OBJECT_NUMBER {
            return;
        }
        self.objects.insert(objnum, ObjectInfo::Free);
    }

    /// Truncate entries at or above `size`, discarding bogus trailing
    /// entries. A `Free` marker is planted at `size - 1` when that number
    /// has no entry, so the declared table size stays observable through
    /// `last_objnum` without changing what that number resolves to.
    pub fn shrink(&mut self, size: u32) {
        if size == 0 {
            self.objects.clear();
            return;
        }
        self.objects.split_off(&size);
        self.objects.entry(size - 1).or_insert(ObjectInfo::Free);
    }

    /// Overlay `newer` on `older`: for any object number present in both,
    /// the newer layer's entry wins outright. The merged trailer is the
    /// newer layer's if present, else the older's.
    pub fn merge_up(older: Self, newer: Self) -> Self {
        let mut objects = older.objects;
        for (objnum, info) in newer.objects {
            objects.insert(objnum, info);
        }
        let (trailer, trailer_objnum) = if newer.trailer.is_some() {
            (newer.trailer, newer.trailer_objnum)
        } else {
            (older.trailer, older.trailer_objnum)
        };
        Self {
            objects,
            trailer,
            trailer_objnum,
        }
    }
}
