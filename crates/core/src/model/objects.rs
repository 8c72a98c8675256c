//! PDF object types.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use std::collections::HashMap;

/// Dictionary type used throughout the engine.
pub type Dict = HashMap<String, Object>;

/// PDF object - the fundamental value type in a PDF file.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name object (e.g., /Type, /Root)
    Name(String),
    /// String (byte array; PDF strings are binary)
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(Dict),
    /// Stream (dictionary + binary body)
    Stream(Box<StreamObject>),
    /// Indirect object reference
    Ref(ObjRef),
}

impl Object {
    /// Check if this is a null object.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as boolean.
    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.type_error("bool")),
        }
    }

    /// Get as integer.
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(self.type_error("int")),
        }
    }

    /// Get numeric value (int or real coerced to f64).
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(self.type_error("number")),
        }
    }

    /// Get as name string.
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(self.type_error("name")),
        }
    }

    /// Get as byte string.
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(self.type_error("string")),
        }
    }

    /// Get as array.
    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(self.type_error("array")),
        }
    }

    /// Get as dictionary. Stream objects answer with their attribute dict,
    /// since trailers may be carried by cross-reference streams.
    pub fn as_dict(&self) -> Result<&Dict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.attrs),
            _ => Err(self.type_error("dict")),
        }
    }

    /// Get as stream.
    pub fn as_stream(&self) -> Result<&StreamObject> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(self.type_error("stream")),
        }
    }

    /// Get as indirect reference.
    pub const fn as_objref(&self) -> Result<&ObjRef> {
        match self {
            Self::Ref(r) => Ok(r),
            _ => Err(self.type_error("ref")),
        }
    }

    /// Object number behind a reference, if this is one.
    pub const fn ref_objnum(&self) -> Option<u32> {
        match self {
            Self::Ref(r) => Some(r.objnum),
            _ => None,
        }
    }

    /// Get type name for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }

    const fn type_error(&self, expected: &'static str) -> PdfError {
        PdfError::TypeError {
            expected,
            got: self.type_name(),
        }
    }
}

/// PDF indirect object reference (`N G R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    /// Object number
    pub objnum: u32,
    /// Generation number
    pub genno: u32,
}

impl ObjRef {
    /// Create a new object reference.
    pub const fn new(objnum: u32, genno: u32) -> Self {
        Self { objnum, genno }
    }
}

/// PDF stream - dictionary attributes plus a binary body.
///
/// The body is kept raw (still filtered, possibly still encrypted); the
/// document layer owns decryption and filter decoding because both need
/// context a lone stream does not have (encryption key, indirect /Length).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamObject {
    /// Stream dictionary attributes
    pub attrs: Dict,
    /// Raw (encoded) body bytes
    rawdata: Bytes,
    /// Whether the body has already been decrypted in place
    decrypted: bool,
    /// Object number, when parsed as an indirect object
    pub objnum: u32,
    /// Generation number, when parsed as an indirect object
    pub genno: u32,
}

impl StreamObject {
    /// Create a new stream.
    pub fn new(attrs: Dict, rawdata: impl Into<Bytes>) -> Self {
        Self {
            attrs,
            rawdata: rawdata.into(),
            decrypted: false,
            objnum: 0,
            genno: 0,
        }
    }

    /// Set the owning object identity.
    pub const fn set_identity(&mut self, objnum: u32, genno: u32) {
        self.objnum = objnum;
        self.genno = genno;
    }

    /// Raw (encoded) body bytes.
    pub fn rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    /// Raw body as shared bytes.
    pub fn rawdata_bytes(&self) -> Bytes {
        self.rawdata.clone()
    }

    /// Whether the raw body has already been decrypted.
    pub const fn is_decrypted(&self) -> bool {
        self.decrypted
    }

    /// Replace the raw body with its decrypted form.
    pub fn replace_decrypted(&mut self, data: Vec<u8>) {
        self.rawdata = Bytes::from(data);
        self.decrypted = true;
    }

    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.attrs.get(name)
    }

    /// The stream's /Type name, if present.
    pub fn type_name(&self) -> Option<&str> {
        self.attrs.get("Type").and_then(|t| t.as_name().ok())
    }
}

/// Direct integer lookup: the value must be a plain integer, not a
/// reference. Mirrors how trailer bookkeeping keys (/Prev, /Size, /XRefStm)
/// are read - an indirect value there is treated as absent.
pub fn dict_direct_int(dict: &Dict, key: &str) -> Option<i64> {
    dict.get(key).and_then(|v| v.as_int().ok())
}
