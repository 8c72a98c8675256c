//! Object streams: container objects bundling compressed objects.
//!
//! An object stream's body starts with `/N` pairs of
//! `objnum offset` integers (the offsets are relative to `/First`),
//! followed by the members' serialized bytes. The document caches one
//! parsed `ObjectStream` per archive object number for its lifetime.

use crate::error::{PdfError, Result};
use crate::model::{Object, StreamObject, dict_direct_int};
use crate::parser::ObjectParser;
use bytes::Bytes;

pub struct ObjectStream {
    /// `(objnum, offset-within-body)` pairs in archive order.
    offsets: Vec<(u32, usize)>,
    /// Decoded body.
    data: Bytes,
    first: usize,
}

impl ObjectStream {
    /// Build from a stream object whose body has already been decoded.
    /// Returns `None` when the stream is not a well-formed `/Type /ObjStm`.
    pub fn create(stream: &StreamObject, decoded: Bytes) -> Option<Self> {
        if stream.type_name() != Some("ObjStm") {
            return None;
        }
        let n = dict_direct_int(&stream.attrs, "N")?;
        let first = dict_direct_int(&stream.attrs, "First")?;
        if n <= 0 || first < 0 {
            return None;
        }
        let n = n as usize;
        let first = first as usize;
        if first > decoded.len() {
            return None;
        }

        let mut header = ObjectParser::new(&decoded[..first]);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let objnum = header.parse_object().ok()?.as_int().ok()?;
            let offset = header.parse_object().ok()?.as_int().ok()?;
            if objnum < 0 || objnum > i64::from(u32::MAX) || offset < 0 {
                return None;
            }
            offsets.push((objnum as u32, offset as usize));
        }

        Some(Self {
            offsets,
            data: decoded,
            first,
        })
    }

    /// `(objnum, offset)` pairs in archive order.
    pub fn object_info(&self) -> &[(u32, usize)] {
        &self.offsets
    }

    /// Parse the member at `index`, verifying it holds `objnum`.
    pub fn parse_object(&self, objnum: u32, index: usize) -> Result<Object> {
        let &(stored_objnum, offset) = self
            .offsets
            .get(index)
            .ok_or(PdfError::ObjectNotFound(objnum))?;
        if stored_objnum != objnum {
            return Err(PdfError::ObjectNotFound(objnum));
        }
        let start = self
            .first
            .checked_add(offset)
            .filter(|&s| s <= self.data.len())
            .ok_or(PdfError::ObjectNotFound(objnum))?;
        let mut parser = ObjectParser::new_at(&self.data, start);
        parser.parse_object()
    }
}
