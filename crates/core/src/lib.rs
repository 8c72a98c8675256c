//! sucre - a PDF parsing engine built around cross-reference resolution
//! and incremental updates.
//!
//! The engine turns an arbitrary, possibly malformed, byte stream into an
//! addressable object graph: it reconstructs the cross-reference table
//! from classic `xref` sections and cross-reference streams (merging
//! incrementally-appended layers deterministically), initializes the
//! standard security handler for encrypted files, resolves indirect
//! objects lazily (including object-stream members), and falls back to a
//! full-file scan when the structural metadata is missing or lies.
//!
//! ```no_run
//! use sucre_core::document::PdfDocument;
//!
//! let data = std::fs::read("input.pdf")?;
//! let doc = PdfDocument::new(&data, "")?;
//! let root = doc.root()?;
//! println!("{} objects, catalog type {:?}", doc.last_objnum(), root.get("Type"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

pub use document::{ObjectKind, PdfDocument, XrefTable};
pub use error::{PdfError, Result};
pub use model::{Dict, ObjRef, Object, StreamObject};
