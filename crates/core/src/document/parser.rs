//! Document parsing: header scan, xref discovery, chain loading, object
//! resolution, and the rebuild fallback.
//!
//! `PdfDocument` owns the whole load sequence. Control flow:
//! header scan -> startxref discovery -> classic (V4) then stream (V5)
//! chain load -> encryption setup -> /Root validation; any structural
//! failure falls back to a full-file rebuild exactly once.

use super::linearized::LinearizedHeader;
use super::objstream::ObjectStream;
use super::rebuild::{IndirectObject, RebuildScanner, ScanStatus, find_endstream};
use super::security::{SecurityHandler, create_security_handler};
use super::xref::{MAX_OBJECT_NUMBER, MAX_XREF_SIZE, ObjectInfo, XrefTable};
use crate::codec::filters;
use crate::error::{PdfError, Result};
use crate::model::{Dict, Object, StreamObject, dict_direct_int};
use crate::parser::{Lexer, ObjectParser};
use bytes::Bytes;
use indexmap::IndexMap;
use memmap2::Mmap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;

/// Default number of resolved objects kept in the LRU cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// `%PDF-x.y` header length.
const PDF_HEADER_SIZE: u64 = 9;
/// The header must start within this many bytes of the file start.
const HEADER_SEARCH_WINDOW: usize = 1024;
/// Backward search window for the `startxref` keyword.
const STARTXREF_SEARCH_WINDOW: usize = 4096;
/// Classic xref entries are exactly 20 bytes.
const XREF_ENTRY_SIZE: usize = 20;
/// Classic entries are bulk-read in batches of this many.
const ENTRY_READ_BATCH: u32 = 1024;
/// Inline `trailer` dictionaries have no owning object.
const INLINE_TRAILER_OBJNUM: u32 = 0;
/// Sentinel for "no such object number".
const INVALID_OBJNUM: u32 = u32::MAX;

/// Document buffer: owned copy or shared (caller-provided / mmap-backed).
#[derive(Clone)]
enum PdfBytes {
    Owned(Bytes),
    Shared(Bytes),
}

impl PdfBytes {
    const fn as_bytes(&self) -> &Bytes {
        match self {
            Self::Owned(data) => data,
            Self::Shared(data) => data,
        }
    }

    fn as_slice(&self) -> &[u8] {
        self.as_bytes().as_ref()
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn slice(&self, start: usize, end: usize) -> Bytes {
        self.as_bytes().slice(start..end)
    }
}

/// LRU cache of resolved objects.
struct ObjectCache {
    capacity: usize,
    map: IndexMap<u32, Rc<Object>>,
}

impl ObjectCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: IndexMap::new(),
        }
    }

    fn get(&mut self, objnum: u32) -> Option<Rc<Object>> {
        if self.capacity == 0 {
            return None;
        }
        let pos = self.map.get_index_of(&objnum)?;
        let value = Rc::clone(self.map.get_index(pos)?.1);
        if pos + 1 != self.map.len() {
            self.map.move_index(pos, self.map.len() - 1);
        }
        Some(value)
    }

    fn insert(&mut self, objnum: u32, value: Rc<Object>) {
        if self.capacity == 0 {
            return;
        }
        if self.map.contains_key(&objnum) {
            self.map.shift_remove(&objnum);
        }
        self.map.insert(objnum, value);
        if self.map.len() > self.capacity {
            self.map.shift_remove_index(0);
        }
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

/// Scoped member of the "currently resolving" set; removal is guaranteed
/// on every exit path.
struct ResolvingGuard<'a> {
    set: &'a RefCell<FxHashSet<u32>>,
    objnum: u32,
}

impl<'a> ResolvingGuard<'a> {
    /// `None` when `objnum` is already being resolved (a cycle).
    fn enter(set: &'a RefCell<FxHashSet<u32>>, objnum: u32) -> Option<Self> {
        if !set.borrow_mut().insert(objnum) {
            return None;
        }
        Some(Self { set, objnum })
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.objnum);
    }
}

/// Public classification of an object number's state. The internal `Null`
/// sentinel never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Free,
    Normal,
    ObjStream,
    Compressed,
}

/// One `/Index` segment of a cross-reference stream.
struct IndexSegment {
    start: u32,
    count: u32,
}

fn cross_ref_v5_indices(index: Option<&Object>, size: u32) -> Vec<IndexSegment> {
    let mut segments = Vec::new();
    if let Some(Object::Array(arr)) = index {
        for pair in arr.chunks(2) {
            if pair.len() != 2 {
                continue;
            }
            let (Ok(start), Ok(count)) = (pair[0].as_int(), pair[1].as_int()) else {
                continue;
            };
            if start < 0 || count <= 0 {
                continue;
            }
            let (Ok(start), Ok(count)) = (u32::try_from(start), u32::try_from(count)) else {
                continue;
            };
            segments.push(IndexSegment { start, count });
        }
    }
    if segments.is_empty() {
        segments.push(IndexSegment { start: 0, count: size });
    }
    segments
}

fn field_widths(w: Option<&Object>) -> Option<Vec<u32>> {
    let Some(Object::Array(arr)) = w else {
        return None;
    };
    let mut widths = Vec::with_capacity(arr.len());
    for item in arr {
        widths.push(u32::try_from(item.as_int().ok()?).ok()?);
    }
    Some(widths)
}

/// Big-endian accumulation of a variable-width field; width 0 yields 0.
/// Wrapping matches the original accumulator semantics on absurd widths.
fn var_int(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_mul(256).wrapping_add(u32::from(b)))
}

/// A PDF document: the parsed cross-reference chain plus lazy object
/// resolution over the underlying bytes.
///
/// Not thread-safe: resolution mutates internal caches, so concurrent use
/// must be serialized by the caller.
pub struct PdfDocument {
    data: PdfBytes,
    xref: XrefTable,
    header_offset: u64,
    version: u32,
    password: String,
    security_handler: Option<Box<dyn SecurityHandler>>,
    /// Object number of the unencrypted metadata stream (0 = none).
    metadata_objnum: u32,
    /// Object number holding the /Encrypt dictionary (0 = none); its
    /// strings are stored unencrypted and must not be run through the
    /// cipher.
    encrypt_objnum: u32,
    object_streams: RefCell<FxHashMap<u32, Rc<ObjectStream>>>,
    resolving: RefCell<FxHashSet<u32>>,
    cache: RefCell<ObjectCache>,
    last_xref_offset: u64,
    xref_rebuilt: bool,
    xref_is_stream: bool,
    linearized: Option<LinearizedHeader>,
}

impl PdfDocument {
    fn from_parts(data: PdfBytes, password: &str, linearized_entry: bool) -> Result<Self> {
        let mut doc = Self {
            data,
            xref: XrefTable::new(),
            header_offset: 0,
            version: 0,
            password: password.to_string(),
            security_handler: None,
            metadata_objnum: 0,
            encrypt_objnum: 0,
            object_streams: RefCell::new(FxHashMap::default()),
            resolving: RefCell::new(FxHashSet::default()),
            cache: RefCell::new(ObjectCache::new(DEFAULT_CACHE_CAPACITY)),
            last_xref_offset: 0,
            xref_rebuilt: false,
            xref_is_stream: false,
            linearized: None,
        };
        if linearized_entry {
            doc.start_linearized_parse()?;
        } else {
            doc.start_parse()?;
        }
        Ok(doc)
    }

    /// Parse a document from raw bytes (copied).
    pub fn new<D: AsRef<[u8]>>(data: D, password: &str) -> Result<Self> {
        Self::from_parts(
            PdfBytes::Owned(Bytes::copy_from_slice(data.as_ref())),
            password,
            false,
        )
    }

    /// Parse a document from shared bytes (zero-copy).
    pub fn new_from_bytes(data: Bytes, password: &str) -> Result<Self> {
        Self::from_parts(PdfBytes::Shared(data), password, false)
    }

    /// Parse a memory-mapped document.
    pub fn new_from_mmap(mmap: Mmap, password: &str) -> Result<Self> {
        Self::from_parts(PdfBytes::Shared(Bytes::from_owner(mmap)), password, false)
    }

    /// Linearized entry path: consume the first-page xref section first
    /// and defer the main chain to `load_main_xref`. Falls through to the
    /// standard sequence when the file is not actually linearized.
    pub fn new_linearized<D: AsRef<[u8]>>(data: D, password: &str) -> Result<Self> {
        Self::from_parts(
            PdfBytes::Owned(Bytes::copy_from_slice(data.as_ref())),
            password,
            true,
        )
    }

    /// Linearized entry path over shared bytes.
    pub fn new_linearized_from_bytes(data: Bytes, password: &str) -> Result<Self> {
        Self::from_parts(PdfBytes::Shared(data), password, true)
    }

    // ----- public queries ---------------------------------------------

    /// Raw document bytes.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// File version as major*10 + minor (e.g. 17 for `%PDF-1.7`).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The merged trailer dictionary.
    pub fn trailer(&self) -> Option<&Dict> {
        self.xref.trailer()
    }

    /// The merged cross-reference table.
    pub fn xref_table(&self) -> &XrefTable {
        &self.xref
    }

    /// Whether the table came from a rebuild scan.
    pub fn xref_was_rebuilt(&self) -> bool {
        self.xref_rebuilt
    }

    /// Whether the main table was a cross-reference stream.
    pub fn xref_is_stream(&self) -> bool {
        self.xref_is_stream
    }

    /// Offset of the last processed xref section (0 after a rebuild).
    pub fn last_xref_offset(&self) -> u64 {
        self.last_xref_offset
    }

    /// The linearization header, when the file is linearized.
    pub fn linearized(&self) -> Option<&LinearizedHeader> {
        self.linearized.as_ref()
    }

    /// Highest known object number.
    pub fn last_objnum(&self) -> u32 {
        self.xref.last_objnum()
    }

    /// Object number validity: bounded by the highest known number.
    pub fn is_valid_objnum(&self, objnum: u32) -> bool {
        objnum <= self.xref.last_objnum()
    }

    /// Public view of an object number's state; the internal sentinel
    /// reads as absent.
    pub fn object_kind(&self, objnum: u32) -> Option<ObjectKind> {
        match self.xref.get(objnum)? {
            ObjectInfo::Free => Some(ObjectKind::Free),
            ObjectInfo::Normal { .. } => Some(ObjectKind::Normal),
            ObjectInfo::ObjStream { .. } => Some(ObjectKind::ObjStream),
            ObjectInfo::Compressed { .. } => Some(ObjectKind::Compressed),
            ObjectInfo::Null => None,
        }
    }

    /// Whether the object number is free (absent numbers are free).
    pub fn is_object_free(&self, objnum: u32) -> bool {
        matches!(self.object_kind(objnum), None | Some(ObjectKind::Free))
    }

    /// All object numbers with entries, ascending.
    pub fn object_numbers(&self) -> Vec<u32> {
        self.xref
            .iter()
            .filter(|(_, info)| !matches!(info, ObjectInfo::Null))
            .map(|(objnum, _)| objnum)
            .collect()
    }

    /// Object number of the document catalog, if the trailer names one.
    pub fn root_objnum(&self) -> Option<u32> {
        self.trailer()?.get("Root")?.ref_objnum()
    }

    /// The resolved document catalog.
    pub fn root(&self) -> Result<Dict> {
        let objnum = self.root_objnum().ok_or(PdfError::FormatError)?;
        self.get_object(objnum)?
            .as_dict()
            .cloned()
            .map_err(|_| PdfError::FormatError)
    }

    /// The resolved /Encrypt dictionary, if the document is encrypted.
    pub fn encrypt_dict(&self) -> Option<Dict> {
        let encrypt = self.trailer()?.get("Encrypt")?;
        match encrypt {
            Object::Dict(d) => Some(d.clone()),
            Object::Ref(r) => self
                .get_object_uncached(r.objnum)
                .ok()
                .and_then(|obj| obj.as_dict().ok().cloned()),
            _ => None,
        }
    }

    /// The trailer /ID array as raw byte strings.
    pub fn id_array(&self) -> Vec<Vec<u8>> {
        let Some(id) = self.trailer().and_then(|t| t.get("ID")) else {
            return Vec::new();
        };
        let resolved = self.resolve(id).unwrap_or(Object::Null);
        match resolved.as_array() {
            Ok(arr) => arr
                .iter()
                .filter_map(|o| o.as_string().ok().map(<[u8]>::to_vec))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Permission flags; 0xFFFFFFFF when the document is unencrypted.
    pub fn permissions(&self) -> u32 {
        self.security_handler
            .as_ref()
            .map_or(0xFFFF_FFFF, |handler| handler.permissions())
    }

    /// Whether a security handler is active.
    pub fn is_encrypted(&self) -> bool {
        self.security_handler.is_some()
    }

    // ----- orchestration ----------------------------------------------

    fn start_parse(&mut self) -> Result<()> {
        self.init_header()?;
        self.last_xref_offset = self.parse_startxref();
        if self.last_xref_offset >= self.header_offset + PDF_HEADER_SIZE {
            let offset = self.last_xref_offset;
            if !self.load_all_xref_v4(offset) && !self.load_all_xref_v5(offset) {
                if !self.rebuild_cross_ref() {
                    return Err(PdfError::FormatError);
                }
                self.xref_rebuilt = true;
                self.last_xref_offset = 0;
            }
        } else {
            if !self.rebuild_cross_ref() {
                return Err(PdfError::FormatError);
            }
            self.xref_rebuilt = true;
        }
        self.finish_parse()
    }

    fn start_linearized_parse(&mut self) -> Result<()> {
        self.init_header()?;
        let data = self.data.as_slice();
        let doc_size = data.len() as u64;
        self.linearized =
            LinearizedHeader::parse(&data[self.header_offset as usize..], doc_size);
        let Some(header) = self.linearized.clone() else {
            return self.start_parse();
        };

        self.last_xref_offset = header.last_xref_offset;
        let mut first_xref_offset = self.last_xref_offset;

        let loaded_v4 = self.load_first_page_v4(first_xref_offset);
        if !loaded_v4 && !self.load_cross_ref_v5(&mut first_xref_offset, true) {
            if !self.rebuild_cross_ref() {
                return Err(PdfError::FormatError);
            }
            self.xref_rebuilt = true;
            self.last_xref_offset = 0;
        }
        self.finish_parse()
    }

    /// First-page classic section for the linearized entry: entries plus
    /// trailer, with a table-size consistency check.
    fn load_first_page_v4(&mut self, offset: u64) -> bool {
        let Some(after) = self.load_cross_ref_v4(offset, false) else {
            return false;
        };
        let Some(trailer) = self.load_trailer_v4(after) else {
            // A table without a parsable trailer is useless here; let the
            // stream loader or the rebuild have a go.
            return false;
        };
        self.xref.set_trailer(trailer, INLINE_TRAILER_OBJNUM);
        let xrefsize = self
            .trailer()
            .and_then(|t| dict_direct_int(t, "Size"))
            .unwrap_or(0);
        if xrefsize > 0 {
            let expected_last = (xrefsize - 1) as u32;
            if self.xref.last_objnum() != expected_last {
                if !self.rebuild_cross_ref() {
                    return false;
                }
                self.xref_rebuilt = true;
                self.last_xref_offset = 0;
            }
        }
        true
    }

    /// Deferred main-chain load for linearized documents. The first-page
    /// trailer's /Prev points at the main cross-reference section.
    pub fn load_main_xref(&mut self) -> Result<()> {
        let prev = self
            .trailer()
            .and_then(|t| dict_direct_int(t, "Prev"))
            .ok_or(PdfError::FormatError)?;
        if prev < 0 {
            return Err(PdfError::FormatError);
        }
        if prev == 0 {
            return Ok(());
        }
        let main_offset = prev as u64;

        // Objects parsed during the chain load are bookkeeping, not user
        // data; the metadata exemption is restored afterwards.
        let saved_metadata = self.metadata_objnum;
        self.metadata_objnum = 0;
        self.object_streams.borrow_mut().clear();
        self.cache.borrow_mut().clear();

        let ok = self.load_linearized_main_v4(main_offset)
            || self.load_linearized_main_v5(main_offset);
        self.metadata_objnum = saved_metadata;
        if !ok {
            self.last_xref_offset = 0;
            return Err(PdfError::FormatError);
        }
        Ok(())
    }

    fn finish_parse(&mut self) -> Result<()> {
        self.set_encrypt_handler()?;

        if self.root_dict_resolvable().is_none() {
            if self.xref_rebuilt {
                return Err(PdfError::FormatError);
            }
            self.security_handler = None;
            if !self.rebuild_cross_ref() {
                return Err(PdfError::FormatError);
            }
            self.xref_rebuilt = true;
            self.set_encrypt_handler()?;
            if self.root_dict_resolvable().is_none() {
                return Err(PdfError::FormatError);
            }
        }

        if self.root_objnum_or_invalid() == INVALID_OBJNUM {
            self.security_handler = None;
            if !self.rebuild_cross_ref() || self.root_objnum_or_invalid() == INVALID_OBJNUM {
                return Err(PdfError::FormatError);
            }
            self.xref_rebuilt = true;
            self.set_encrypt_handler()?;
        }

        if let Some(handler) = &self.security_handler
            && !handler.is_metadata_encrypted()
            && let Some(root) = self.root_dict_resolvable()
            && let Some(metadata) = root.get("Metadata").and_then(Object::ref_objnum)
        {
            self.metadata_objnum = metadata;
        }
        Ok(())
    }

    fn root_objnum_or_invalid(&self) -> u32 {
        self.root_objnum().unwrap_or(INVALID_OBJNUM)
    }

    fn root_dict_resolvable(&self) -> Option<Dict> {
        let objnum = self.root_objnum()?;
        self.get_object(objnum).ok()?.as_dict().cloned().ok()
    }

    /// (Re)initialize encryption from the trailer. Runs before /Root
    /// validation because resolving an indirect /Encrypt dictionary needs
    /// a working table.
    fn set_encrypt_handler(&mut self) -> Result<()> {
        self.security_handler = None;
        self.encrypt_objnum = 0;
        if self.xref.trailer().is_none() {
            return Err(PdfError::FormatError);
        }
        self.encrypt_objnum = self
            .trailer()
            .and_then(|t| t.get("Encrypt"))
            .and_then(Object::ref_objnum)
            .unwrap_or(0);
        let Some(encrypt) = self.encrypt_dict() else {
            return Ok(());
        };
        let doc_id = self.id_array();
        let handler = create_security_handler(&encrypt, &doc_id, &self.password)?;
        self.security_handler = Some(handler);
        // Encrypted content cached before the handler existed would leak
        // ciphertext.
        self.cache.borrow_mut().clear();
        Ok(())
    }

    /// Locate `%PDF` near the file start and read the version digits at
    /// offsets 5 and 7.
    fn init_header(&mut self) -> Result<()> {
        let data = self.data.as_slice();
        let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        let offset = window
            .windows(4)
            .position(|w| w == b"%PDF")
            .ok_or(PdfError::FormatError)? as u64;
        if (data.len() as u64) < offset + PDF_HEADER_SIZE {
            return Err(PdfError::FormatError);
        }
        self.header_offset = offset;

        let digit_at = |i: u64| -> u32 {
            data.get((offset + i) as usize)
                .filter(|b| b.is_ascii_digit())
                .map_or(0, |b| u32::from(b - b'0'))
        };
        self.version = digit_at(5) * 10 + digit_at(7);
        Ok(())
    }

    /// Locate `startxref` near the end of file and read the offset it
    /// announces; 0 when absent or out of bounds.
    fn parse_startxref(&self) -> u64 {
        let data = self.data.as_slice();
        let mut lexer = Lexer::new(data);
        lexer.set_pos(data.len());
        if !lexer.backwards_search_to_word(b"startxref", STARTXREF_SEARCH_WINDOW) {
            return 0;
        }
        lexer.get_keyword(); // consume "startxref"
        let Some(word) = lexer.next_word() else {
            return 0;
        };
        match word.as_offset() {
            Some(offset) if offset < data.len() as u64 => offset,
            _ => 0,
        }
    }

    // ----- classic (V4) loader ----------------------------------------

    /// Walk the whole classic chain at `main_offset`.
    ///
    /// Pass 1 follows trailers newest to oldest, layering each older
    /// trailer underneath. Pass 2 loads entry data strictly oldest to
    /// newest so that newer sections overwrite older ones, then verifies
    /// the first normal entry's stored position.
    fn load_all_xref_v4(&mut self, main_offset: u64) -> bool {
        let Some(after_table) = self.load_cross_ref_v4(main_offset, true) else {
            return false;
        };
        let Some(trailer) = self.load_trailer_v4(after_table) else {
            return false;
        };
        self.xref.set_trailer(trailer, INLINE_TRAILER_OBJNUM);

        let trailer = self.xref.trailer().expect("just set");
        let xrefsize = dict_direct_int(trailer, "Size").unwrap_or(0);
        if xrefsize > 0 && xrefsize <= i64::from(MAX_XREF_SIZE) {
            self.xref.shrink(xrefsize as u32);
        }

        let trailer = self.xref.trailer().expect("just set");
        let mut xref_stream_list = vec![dict_direct_int(trailer, "XRefStm").unwrap_or(0)];
        let mut xref_list = vec![main_offset];
        let mut seen_offsets = FxHashSet::from_iter([main_offset]);

        let mut prev = dict_direct_int(trailer, "Prev").unwrap_or(0);
        while prev > 0 {
            let offset = prev as u64;
            if seen_offsets.contains(&offset) {
                log::warn!("cyclic /Prev chain at offset {offset}");
                return false;
            }
            seen_offsets.insert(offset);
            xref_list.insert(0, offset);

            let Some(after) = self.load_cross_ref_v4(offset, true) else {
                return false;
            };
            let Some(dict) = self.load_trailer_v4(after) else {
                return false;
            };
            prev = dict_direct_int(&dict, "Prev").unwrap_or(0);
            xref_stream_list.insert(0, dict_direct_int(&dict, "XRefStm").unwrap_or(0));

            // Layer the older trailer underneath the running table.
            let current = std::mem::take(&mut self.xref);
            self.xref = XrefTable::merge_up(
                XrefTable::with_trailer(dict, INLINE_TRAILER_OBJNUM),
                current,
            );
        }

        for i in 0..xref_list.len() {
            if xref_list[i] > 0 && self.load_cross_ref_v4(xref_list[i], false).is_none() {
                return false;
            }
            if xref_stream_list[i] > 0 {
                let mut pos = xref_stream_list[i] as u64;
                if !self.load_cross_ref_v5(&mut pos, false) {
                    return false;
                }
            }
        }
        self.verify_cross_ref_v4()
    }

    /// Main-chain walk for linearized files: like `load_all_xref_v4`, but
    /// the running table already holds the first-page section, and the
    /// chain starts at the main section the first-page trailer points to.
    fn load_linearized_main_v4(&mut self, main_offset: u64) -> bool {
        let Some(after_table) = self.load_cross_ref_v4(main_offset, false) else {
            return false;
        };
        let Some(main_trailer) = self.load_trailer_v4(after_table) else {
            return false;
        };
        // The first-page trailer is still the current one.
        let first_page_size = self
            .trailer()
            .and_then(|t| dict_direct_int(t, "Size"))
            .unwrap_or(0);
        if first_page_size == 0 {
            return false;
        }
        let mut xref_stream_list = vec![
            self.trailer()
                .and_then(|t| dict_direct_int(t, "XRefStm"))
                .unwrap_or(0),
        ];
        let mut xref_list = vec![main_offset];
        let mut seen_offsets = FxHashSet::from_iter([main_offset]);

        let mut prev = dict_direct_int(&main_trailer, "Prev").unwrap_or(0);
        let current = std::mem::take(&mut self.xref);
        self.xref = XrefTable::merge_up(
            XrefTable::with_trailer(main_trailer, INLINE_TRAILER_OBJNUM),
            current,
        );

        while prev > 0 {
            let offset = prev as u64;
            if seen_offsets.contains(&offset) {
                return false;
            }
            seen_offsets.insert(offset);
            xref_list.insert(0, offset);

            let Some(after) = self.load_cross_ref_v4(offset, true) else {
                return false;
            };
            let Some(dict) = self.load_trailer_v4(after) else {
                return false;
            };
            prev = dict_direct_int(&dict, "Prev").unwrap_or(0);
            xref_stream_list.insert(0, dict_direct_int(&dict, "XRefStm").unwrap_or(0));

            let current = std::mem::take(&mut self.xref);
            self.xref = XrefTable::merge_up(
                XrefTable::with_trailer(dict, INLINE_TRAILER_OBJNUM),
                current,
            );
        }

        if xref_stream_list[0] > 0 {
            let mut pos = xref_stream_list[0] as u64;
            if !self.load_cross_ref_v5(&mut pos, false) {
                return false;
            }
        }
        for i in 1..xref_list.len() {
            if xref_list[i] > 0 && self.load_cross_ref_v4(xref_list[i], false).is_none() {
                return false;
            }
            if xref_stream_list[i] > 0 {
                let mut pos = xref_stream_list[i] as u64;
                if !self.load_cross_ref_v5(&mut pos, false) {
                    return false;
                }
            }
        }
        true
    }

    fn load_linearized_main_v5(&mut self, main_offset: u64) -> bool {
        let mut offset = main_offset;
        if !self.load_cross_ref_v5(&mut offset, false) {
            return false;
        }
        let mut seen_offsets = FxHashSet::default();
        while offset > 0 {
            seen_offsets.insert(offset);
            if !self.load_cross_ref_v5(&mut offset, false) {
                return false;
            }
            if seen_offsets.contains(&offset) {
                return false;
            }
        }
        self.object_streams.borrow_mut().clear();
        self.xref_is_stream = true;
        true
    }

    /// Parse one classic `xref` section at `pos`. With `skip` the entry
    /// data is stepped over without being stored (first-pass chain walk).
    /// Returns the position right after the section (where `trailer`
    /// should follow).
    fn load_cross_ref_v4(&mut self, pos: u64, skip: bool) -> Option<usize> {
        let data = self.data.as_slice();
        let mut lexer = Lexer::new(data);
        lexer.set_pos(pos as usize);
        if lexer.get_keyword() != b"xref" {
            return None;
        }

        let mut entries: Vec<(u32, ClassicEntry)> = Vec::new();
        loop {
            let saved_pos = lexer.pos();
            let Some(word) = lexer.next_word() else {
                return None;
            };
            if !word.is_number {
                lexer.set_pos(saved_pos);
                break;
            }
            let start_objnum = word.as_u32()?;
            if start_objnum >= MAX_OBJECT_NUMBER {
                return None;
            }
            let count = lexer.next_word()?.as_u32().unwrap_or(0);
            lexer.skip_whitespace();

            if skip {
                let bytes = (count as usize).checked_mul(XREF_ENTRY_SIZE)?;
                let end = lexer.pos().checked_add(bytes)?;
                if end > data.len() {
                    return None;
                }
                lexer.set_pos(end);
                continue;
            }

            if !self.read_cross_ref_v4_subsection(&mut lexer, start_objnum, count, &mut entries)
            {
                return None;
            }
        }

        let end_pos = lexer.pos();
        self.merge_classic_entries(&entries);
        Some(end_pos)
    }

    /// Bulk-read one subsection's fixed 20-byte records in bounded
    /// batches.
    fn read_cross_ref_v4_subsection(
        &self,
        lexer: &mut Lexer<'_>,
        start_objnum: u32,
        count: u32,
        entries: &mut Vec<(u32, ClassicEntry)>,
    ) -> bool {
        if count == 0 {
            return true;
        }
        let Some(new_size) = entries.len().checked_add(count as usize) else {
            return false;
        };
        if new_size > MAX_XREF_SIZE as usize {
            return false;
        }
        let max_entries_in_file = self.data.len() / XREF_ENTRY_SIZE;
        if new_size > max_entries_in_file {
            return false;
        }

        let mut remaining = count;
        while remaining > 0 {
            let in_block = remaining.min(ENTRY_READ_BATCH);
            let Some(block) = lexer.read_block(in_block as usize * XREF_ENTRY_SIZE) else {
                return false;
            };
            for i in 0..in_block {
                let objnum = start_objnum + (count - remaining) + i;
                let entry = &block[i as usize * XREF_ENTRY_SIZE..][..XREF_ENTRY_SIZE];
                match parse_classic_entry(entry) {
                    Some(info) => entries.push((objnum, info)),
                    None => return false,
                }
            }
            remaining -= in_block;
        }
        true
    }

    fn merge_classic_entries(&mut self, entries: &[(u32, ClassicEntry)]) {
        for &(objnum, entry) in entries {
            match entry {
                // Only a generation above zero marks the object free.
                ClassicEntry::Free { genno } if genno > 0 => self.xref.set_free(objnum),
                ClassicEntry::Free { .. } => {}
                ClassicEntry::InUse { genno, pos } => self.xref.add_normal(objnum, genno, pos),
            }
        }
    }

    /// Parse the `trailer` keyword and its dictionary at `pos`.
    fn load_trailer_v4(&self, pos: usize) -> Option<Dict> {
        let data = self.data.as_slice();
        let mut lexer = Lexer::new(data);
        lexer.set_pos(pos);
        if lexer.get_keyword() != b"trailer" {
            return None;
        }
        let mut parser = ObjectParser::new_at(data, lexer.pos());
        match parser.parse_object() {
            Ok(Object::Dict(dict)) => Some(dict),
            _ => None,
        }
    }

    /// Best-effort sanity check: the first normal entry's stored position
    /// must start with the matching object number when parsed there.
    fn verify_cross_ref_v4(&self) -> bool {
        for (objnum, info) in self.xref.iter() {
            let pos = match info {
                ObjectInfo::Normal { pos, .. } | ObjectInfo::ObjStream { pos } => *pos,
                _ => continue,
            };
            if pos == 0 {
                continue;
            }
            let mut lexer = Lexer::new(self.data.as_slice());
            lexer.set_pos(pos as usize);
            return matches!(
                lexer.next_word(),
                Some(word) if word.is_number && word.as_u32() == Some(objnum)
            );
        }
        true
    }

    // ----- stream (V5) loader -----------------------------------------

    /// Walk the whole cross-reference-stream chain at `main_offset`.
    fn load_all_xref_v5(&mut self, main_offset: u64) -> bool {
        let mut offset = main_offset;
        if !self.load_cross_ref_v5(&mut offset, true) {
            return false;
        }
        let mut seen_offsets = FxHashSet::default();
        while offset > 0 {
            seen_offsets.insert(offset);
            if !self.load_cross_ref_v5(&mut offset, false) {
                return false;
            }
            if seen_offsets.contains(&offset) {
                log::warn!("cyclic /Prev chain in cross-reference streams");
                return false;
            }
        }
        self.object_streams.borrow_mut().clear();
        self.xref_is_stream = true;
        true
    }

    /// Load one cross-reference stream. `pos` is updated to the /Prev
    /// offset (0 ends the chain). A main table replaces the running
    /// table; an older one layers underneath it.
    fn load_cross_ref_v5(&mut self, pos: &mut u64, is_main: bool) -> bool {
        let Ok(parsed) = self.parse_object_at(*pos, 0) else {
            return false;
        };
        if parsed.objnum == 0 {
            return false;
        }
        let Object::Stream(stream) = parsed.body else {
            return false;
        };

        let prev = dict_direct_int(&stream.attrs, "Prev").unwrap_or(0);
        if prev < 0 {
            return false;
        }
        let size = dict_direct_int(&stream.attrs, "Size").unwrap_or(0);
        if size < 0 {
            return false;
        }
        *pos = prev as u64;

        let trailer = stream.attrs.clone();
        if is_main {
            let mut table = XrefTable::with_trailer(trailer, parsed.objnum);
            table.shrink(size.min(i64::from(u32::MAX)) as u32);
            self.xref = table;
        } else {
            let current = std::mem::take(&mut self.xref);
            self.xref =
                XrefTable::merge_up(XrefTable::with_trailer(trailer, parsed.objnum), current);
        }

        let segments = cross_ref_v5_indices(stream.get("Index"), size as u32);
        let Some(widths) = field_widths(stream.get("W")) else {
            return false;
        };
        if widths.len() < 3 {
            return false;
        }
        let mut total_width: u32 = 0;
        for &w in &widths {
            total_width = match total_width.checked_add(w) {
                Some(v) => v,
                None => return false,
            };
        }
        if total_width == 0 {
            return false;
        }

        let data = match self.decode_stream_data(&stream) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("failed to decode cross-reference stream: {e}");
                Vec::new()
            }
        };

        let tw = total_width as usize;
        let mut segindex: u32 = 0;
        for segment in &segments {
            let seg_end = segindex
                .checked_add(segment.count)
                .and_then(|v| v.checked_mul(total_width));
            match seg_end {
                Some(end) if (end as usize) <= data.len() => {}
                _ => continue,
            }

            let max_objnum = segment.start.checked_add(segment.count);
            let table_size = if self.xref.is_empty() {
                0
            } else {
                self.xref.last_objnum().saturating_add(1)
            };
            match max_objnum {
                Some(max) if max <= table_size => {}
                _ => continue,
            }

            let seg_data = &data[segindex as usize * tw..];
            for i in 0..segment.count {
                let objnum = segment.start + i;
                if objnum >= MAX_OBJECT_NUMBER {
                    break;
                }
                let entry = &seg_data[i as usize * tw..][..tw];
                self.process_v5_entry(entry, &widths, objnum);
            }
            segindex += segment.count;
        }
        true
    }

    /// Apply one stream-table record, honoring the fill-if-unset conflict
    /// rule: this loader runs newest layer first, so entries that already
    /// resolved must not be overwritten by older sections.
    fn process_v5_entry(&mut self, entry: &[u8], widths: &[u32], objnum: u32) {
        let w0 = widths[0] as usize;
        let w1 = widths[1] as usize;
        let w2 = widths[2] as usize;

        // Missing type field defaults to type 1 (uncompressed).
        let declared = if w0 > 0 { var_int(&entry[..w0]) } else { 1 };
        let field2 = var_int(&entry[w0..w0 + w1]);
        let field3 = var_int(&entry[w0 + w1..w0 + w1 + w2]);

        if declared > 2 {
            // Invalid/reserved record type: skip the object, not the load.
            return;
        }

        let existing = self.xref.get(objnum).copied();
        if existing == Some(ObjectInfo::Null) {
            // Unset: fill from field 2, whatever the declared type says.
            self.xref.add_normal(objnum, 0, u64::from(field2));
            return;
        }
        match existing {
            None | Some(ObjectInfo::Free) => {}
            _ => return,
        }

        match declared {
            0 => self.xref.set_free(objnum),
            1 => self.xref.add_normal(objnum, 0, u64::from(field2)),
            _ => {
                let archive = field2;
                if !self.is_valid_objnum(archive) {
                    return;
                }
                self.xref.add_compressed(objnum, archive, field3);
            }
        }
    }

    // ----- rebuild -----------------------------------------------------

    /// Full-file scan fallback; merges the rebuilt table on top of
    /// whatever partial table exists.
    fn rebuild_cross_ref(&mut self) -> bool {
        log::warn!("xref chain is unusable, rebuilding from a full scan");
        self.object_streams.borrow_mut().clear();
        self.cache.borrow_mut().clear();

        let mut scanner = RebuildScanner::new(self.data.as_slice());
        while scanner.scan(None) != ScanStatus::Done {}
        let Some(rebuilt) = scanner.finish() else {
            return false;
        };
        let current = std::mem::take(&mut self.xref);
        self.xref = XrefTable::merge_up(current, rebuilt);
        true
    }

    // ----- object resolution ------------------------------------------

    /// Resolve one level of indirection.
    pub fn resolve(&self, obj: &Object) -> Result<Object> {
        match obj {
            Object::Ref(r) => self.get_object(r.objnum),
            other => Ok(other.clone()),
        }
    }

    /// Parse the object registered under `objnum`.
    ///
    /// Missing, mismatched, circular, or free objects yield
    /// `ObjectNotFound` - a routine outcome, never a panic.
    pub fn get_object(&self, objnum: u32) -> Result<Object> {
        Ok((*self.get_object_shared(objnum)?).clone())
    }

    /// Like `get_object` but shares the cached allocation.
    pub fn get_object_shared(&self, objnum: u32) -> Result<Rc<Object>> {
        if objnum == 0 || !self.is_valid_objnum(objnum) {
            return Err(PdfError::ObjectNotFound(objnum));
        }
        let Some(_guard) = ResolvingGuard::enter(&self.resolving, objnum) else {
            return Err(PdfError::ObjectNotFound(objnum));
        };
        if let Some(cached) = self.cache.borrow_mut().get(objnum) {
            return Ok(cached);
        }
        let obj = Rc::new(self.load_object(objnum)?);
        self.cache.borrow_mut().insert(objnum, Rc::clone(&obj));
        Ok(obj)
    }

    fn get_object_uncached(&self, objnum: u32) -> Result<Object> {
        if objnum == 0 || !self.is_valid_objnum(objnum) {
            return Err(PdfError::ObjectNotFound(objnum));
        }
        let Some(_guard) = ResolvingGuard::enter(&self.resolving, objnum) else {
            return Err(PdfError::ObjectNotFound(objnum));
        };
        self.load_object(objnum)
    }

    fn load_object(&self, objnum: u32) -> Result<Object> {
        match self.xref.get(objnum) {
            Some(ObjectInfo::Normal { pos, .. }) | Some(ObjectInfo::ObjStream { pos }) => {
                let pos = *pos;
                if pos == 0 {
                    return Err(PdfError::ObjectNotFound(objnum));
                }
                let parsed = self
                    .parse_object_at(pos, objnum)
                    .map_err(|_| PdfError::ObjectNotFound(objnum))?;
                if self.should_decrypt(objnum) {
                    Ok(self.decrypt_object_tree(parsed.body, objnum, parsed.genno))
                } else {
                    Ok(parsed.body)
                }
            }
            Some(ObjectInfo::Compressed { archive, index }) => {
                let (archive, index) = (*archive, *index);
                let stream = self
                    .get_object_stream(archive)
                    .ok_or(PdfError::ObjectNotFound(objnum))?;
                // Members were decrypted together with their container.
                stream
                    .parse_object(objnum, index as usize)
                    .map_err(|_| PdfError::ObjectNotFound(objnum))
            }
            _ => Err(PdfError::ObjectNotFound(objnum)),
        }
    }

    /// Fetch (and cache forever) the archive object stream `archive`.
    fn get_object_stream(&self, archive: u32) -> Option<Rc<ObjectStream>> {
        if let Some(cached) = self.object_streams.borrow().get(&archive) {
            return Some(Rc::clone(cached));
        }
        let pos = match self.xref.get(archive) {
            Some(ObjectInfo::ObjStream { pos }) if *pos > 0 => *pos,
            _ => return None,
        };
        let _guard = ResolvingGuard::enter(&self.resolving, archive)?;

        let parsed = self.parse_object_at(pos, archive).ok()?;
        let body = if self.should_decrypt(archive) {
            self.decrypt_object_tree(parsed.body, archive, parsed.genno)
        } else {
            parsed.body
        };
        let Object::Stream(stream) = body else {
            return None;
        };
        let decoded = self.decode_stream_data(&stream).ok()?;
        let object_stream = Rc::new(ObjectStream::create(&stream, Bytes::from(decoded))?);
        self.object_streams
            .borrow_mut()
            .insert(archive, Rc::clone(&object_stream));
        Some(object_stream)
    }

    /// Parse the indirect object at `offset`. With a nonzero
    /// `expected_objnum`, a mismatched embedded object number is a
    /// resolution failure.
    fn parse_object_at(&self, offset: u64, expected_objnum: u32) -> Result<IndirectObject> {
        let data = self.data.as_slice();
        if offset >= data.len() as u64 {
            return Err(PdfError::SyntaxError(format!(
                "object offset {offset} exceeds file size {}",
                data.len()
            )));
        }
        let mut lexer = Lexer::new(data);
        lexer.set_pos(offset as usize);

        let objnum = lexer
            .next_word()
            .and_then(|w| w.as_u32())
            .ok_or_else(|| PdfError::SyntaxError("expected object number".into()))?;
        let genno = lexer
            .next_word()
            .and_then(|w| w.as_u32())
            .ok_or_else(|| PdfError::SyntaxError("expected generation number".into()))?;
        if lexer.next_word().map(|w| w.word) != Some(b"obj".to_vec()) {
            return Err(PdfError::SyntaxError(format!(
                "expected 'obj' at offset {offset}"
            )));
        }
        if expected_objnum != 0 && objnum != expected_objnum {
            return Err(PdfError::ObjectNotFound(expected_objnum));
        }

        let mut parser = ObjectParser::new_at(data, lexer.pos());
        let body = parser.parse_object()?;
        let mut end_pos = parser.pos();

        let body = if let Object::Dict(dict) = body {
            lexer.set_pos(end_pos);
            let saved_pos = lexer.pos();
            match lexer.next_word() {
                Some(word) if word.word == b"stream" => {
                    let stream =
                        self.read_stream_body(&dict, word.pos, objnum, genno, &mut end_pos)?;
                    Object::Stream(Box::new(stream))
                }
                _ => {
                    lexer.set_pos(saved_pos);
                    Object::Dict(dict)
                }
            }
        } else {
            body
        };

        Ok(IndirectObject {
            objnum,
            genno,
            body,
            end_pos,
        })
    }

    /// Extract a stream body following its dictionary. The declared
    /// /Length is trusted when it fits; structural stream types and
    /// corrupt lengths fall back to an `endstream` scan.
    fn read_stream_body(
        &self,
        dict: &Dict,
        stream_kw_pos: usize,
        objnum: u32,
        genno: u32,
        end_pos: &mut usize,
    ) -> Result<StreamObject> {
        let data = self.data.as_slice();
        let mut start = stream_kw_pos + b"stream".len();
        if data.get(start) == Some(&b'\r') {
            start += 1;
        }
        if data.get(start) == Some(&b'\n') {
            start += 1;
        }
        if start > data.len() {
            return Err(PdfError::UnexpectedEof);
        }

        // XRef and ObjStm streams are parsed while the table is still in
        // flux; an endstream scan is more robust than trusting /Length.
        let force_scan = matches!(
            dict.get("Type"),
            Some(Object::Name(name)) if name == "XRef" || name == "ObjStm"
        );
        let length: usize = if force_scan {
            0
        } else {
            dict.get("Length")
                .and_then(|len| self.resolve(len).ok())
                .and_then(|len| len.as_int().ok())
                .filter(|&len| len > 0)
                .and_then(|len| usize::try_from(len).ok())
                .unwrap_or(0)
        };

        let end = if length > 0 && start + length <= data.len() {
            start + length
        } else {
            match find_endstream(&data[start..]) {
                Some(body_len) => start + body_len,
                None => data.len(),
            }
        };

        let mut stream = StreamObject::new(dict.clone(), self.data.slice(start, end));
        stream.set_identity(objnum, genno);

        let mut lexer = Lexer::new(data);
        lexer.set_pos(end);
        if let Some(word) = lexer.next_word()
            && word.word == b"endstream"
        {
            *end_pos = lexer.pos();
        } else {
            *end_pos = end;
        }
        Ok(stream)
    }

    /// Decode a stream body through its filter chain, resolving indirect
    /// /Filter and /DecodeParms entries.
    fn decode_stream_data(&self, stream: &StreamObject) -> Result<Vec<u8>> {
        let Some(filter) = stream.get("Filter") else {
            return Ok(stream.rawdata().to_vec());
        };
        let filter = self.resolve(filter)?;
        let parms = match stream.get("DecodeParms") {
            Some(parms) => Some(self.resolve(parms)?),
            None => None,
        };
        let names = filters::filter_names(&filter);
        let mut data = stream.rawdata().to_vec();
        for (index, name) in names.iter().enumerate() {
            data = filters::decode(&data, name, filters::parms_at(parms.as_ref(), index))?;
        }
        Ok(data)
    }

    /// Whether `objnum`'s content goes through the security handler. The
    /// designated unencrypted metadata stream and the /Encrypt
    /// dictionary itself are exempt.
    fn should_decrypt(&self, objnum: u32) -> bool {
        self.security_handler.is_some()
            && objnum != self.metadata_objnum
            && objnum != self.encrypt_objnum
    }

    /// Decrypt strings and stream bodies throughout a parsed subtree.
    fn decrypt_object_tree(&self, obj: Object, objnum: u32, genno: u32) -> Object {
        let Some(handler) = &self.security_handler else {
            return obj;
        };
        match obj {
            Object::String(data) => {
                Object::String(handler.decrypt_string(objnum, genno, &data))
            }
            Object::Array(arr) => Object::Array(
                arr.into_iter()
                    .map(|item| self.decrypt_object_tree(item, objnum, genno))
                    .collect(),
            ),
            Object::Dict(dict) => Object::Dict(
                dict.into_iter()
                    .map(|(k, v)| (k, self.decrypt_object_tree(v, objnum, genno)))
                    .collect(),
            ),
            Object::Stream(mut stream) => {
                let attrs = std::mem::take(&mut stream.attrs);
                stream.attrs = attrs
                    .into_iter()
                    .map(|(k, v)| (k, self.decrypt_object_tree(v, objnum, genno)))
                    .collect();
                stream.set_identity(objnum, genno);
                if !stream.is_decrypted() {
                    let decrypted =
                        handler.decrypt_stream(objnum, genno, stream.rawdata(), &stream.attrs);
                    stream.replace_decrypted(decrypted);
                }
                Object::Stream(stream)
            }
            other => other,
        }
    }
}

/// One decoded record of a classic table subsection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassicEntry {
    Free { genno: u32 },
    InUse { genno: u32, pos: u64 },
}

/// Parse one fixed 20-byte classic entry:
/// `<10-digit offset> <5-digit generation> <n|f>` plus a 2-byte EOL.
fn parse_classic_entry(entry: &[u8]) -> Option<ClassicEntry> {
    debug_assert_eq!(entry.len(), XREF_ENTRY_SIZE);
    let genno = ascii_number(&entry[11..16]).unwrap_or(0) as u32;
    if entry[17] == b'f' {
        // The free-list successor in the offset field is not tracked; the
        // generation is all the merge step needs.
        return Some(ClassicEntry::Free { genno });
    }
    let offset = ascii_number(&entry[..10])?;
    if offset == 0 {
        // Tolerated when the ten columns really are zero digits: some
        // producers emit literal zero padding for live objects.
        if !entry[..10].iter().all(u8::is_ascii_digit) {
            return None;
        }
    }
    Some(ClassicEntry::InUse { genno, pos: offset })
}

/// Leading-digit parse; the fixed-width fields are space padded.
fn ascii_number(field: &[u8]) -> Option<u64> {
    let digits = field.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    std::str::from_utf8(&field[..digits]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_entry_parsing() {
        assert_eq!(
            parse_classic_entry(b"0000000017 00000 n\r\n"),
            Some(ClassicEntry::InUse { genno: 0, pos: 17 })
        );
        assert_eq!(
            parse_classic_entry(b"0000000000 65535 f\r\n"),
            Some(ClassicEntry::Free { genno: 65535 })
        );
        // All-zero offset with digit padding is tolerated for 'n'.
        assert_eq!(
            parse_classic_entry(b"0000000000 00001 n\r\n"),
            Some(ClassicEntry::InUse { genno: 1, pos: 0 })
        );
        // Non-digit offset bytes are rejected.
        assert_eq!(parse_classic_entry(b"00000000xx 00000 n\r\n"), None);
    }

    #[test]
    fn var_int_is_big_endian() {
        assert_eq!(var_int(&[]), 0);
        assert_eq!(var_int(&[0x01]), 1);
        assert_eq!(var_int(&[0x01, 0x00]), 256);
        assert_eq!(var_int(&[0x01, 0x02, 0x03]), 0x010203);
    }

    #[test]
    fn v5_indices_default_to_whole_table() {
        let segments = cross_ref_v5_indices(None, 12);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[0].count, 12);

        let arr = Object::Array(vec![
            Object::Int(2),
            Object::Int(3),
            Object::Int(-1),
            Object::Int(4),
            Object::Int(10),
            Object::Int(1),
        ]);
        let segments = cross_ref_v5_indices(Some(&arr), 12);
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start, segments[0].count), (2, 3));
        assert_eq!((segments[1].start, segments[1].count), (10, 1));
    }
}
