//! Document structure: cross-reference chain, object resolution,
//! encryption gate, and the rebuild fallback.

pub mod linearized;
pub mod objstream;
pub mod parser;
pub mod rebuild;
pub mod security;
pub mod xref;

pub use linearized::LinearizedHeader;
pub use objstream::ObjectStream;
pub use parser::{ObjectKind, PdfDocument};
pub use rebuild::{PauseIndicator, RebuildScanner, ScanStatus};
pub use security::{SecurityHandler, create_security_handler};
pub use xref::{MAX_OBJECT_NUMBER, MAX_XREF_SIZE, ObjectInfo, XrefTable};
