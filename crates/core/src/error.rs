//! Error types for the sucre PDF parsing engine.

use thiserror::Error;

/// Primary error type for PDF parsing operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("PDF format error")]
    FormatError,

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("security handler error: {0}")]
    HandlerError(String),

    #[error("invalid password")]
    PasswordError,
}

/// Convenience `Result` type alias for [`PdfError`].
pub type Result<T> = std::result::Result<T, PdfError>;
