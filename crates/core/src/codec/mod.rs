//! Stream filters and ciphers used by the parsing engine.

pub mod aes;
pub mod filters;
pub mod rc4;
