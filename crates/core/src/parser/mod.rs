//! PDF syntax reading.
//!
//! - `lexer`: positioned tokenizer with word-level reads for the xref
//!   machinery;
//! - `objparser`: token-to-object assembly with `N G R` lookahead.

pub mod lexer;
pub mod objparser;

pub use lexer::{Keyword, Lexer, Token, WordResult};
pub use objparser::ObjectParser;
