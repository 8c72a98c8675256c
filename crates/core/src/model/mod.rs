//! PDF object model.
//!
//! The engine's value type (`Object`) plus the stream and indirect
//! reference carriers. Everything here is syntax-neutral: how the values
//! are located and parsed lives in `parser` and `document`.

pub mod objects;

pub use objects::{Dict, ObjRef, Object, StreamObject, dict_direct_int};
