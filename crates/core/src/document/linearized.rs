//! Linearization (fast-web-view) header.
//!
//! A linearized file starts with a small dictionary object carrying the
//! layout parameters. Only the fields the load path needs are kept; the
//! header exists transiently during startup.

use crate::model::{Object, dict_direct_int};
use crate::parser::{Lexer, ObjectParser};

/// The linearization dictionary must start within this many bytes of the
/// header; anything later is treated as not linearized.
const HEADER_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
pub struct LinearizedHeader {
    /// /L - total file length the producer wrote.
    pub file_size: u64,
    /// /T - offset of the last (main) cross-reference section.
    pub last_xref_offset: u64,
    /// /O - object number of the first page.
    pub first_page_objnum: u32,
    /// /N - number of pages.
    pub page_count: u32,
    /// /E - end offset of the first page.
    pub first_page_end: u64,
    /// /P - first page number (0 when absent).
    pub first_page_no: u32,
}

impl LinearizedHeader {
    /// Try to parse the linearization dictionary near the start of the
    /// buffer. `document_size` validates /L. Returns `None` for ordinary
    /// (non-linearized) files.
    pub fn parse(data: &[u8], document_size: u64) -> Option<Self> {
        let mut lexer = Lexer::new(data);

        // First indirect object: N G obj << ... >>
        let objnum = lexer.next_word()?.as_u32()?;
        let _gen = lexer.next_word()?.as_u32()?;
        if objnum == 0 {
            return None;
        }
        let obj_kw = lexer.next_word()?;
        if obj_kw.word != b"obj" || obj_kw.pos > HEADER_LIMIT {
            return None;
        }

        let mut parser = ObjectParser::new_at(data, lexer.pos());
        let dict_obj = parser.parse_object().ok()?;
        let dict = match &dict_obj {
            Object::Dict(d) => d,
            _ => return None,
        };
        dict.get("Linearized")?;

        let file_size = dict_direct_int(dict, "L").filter(|&l| l > 0)? as u64;
        if file_size != document_size {
            log::warn!(
                "linearization /L {file_size} disagrees with file size {document_size}"
            );
            return None;
        }
        let last_xref_offset = dict_direct_int(dict, "T").filter(|&t| t > 0)? as u64;
        let first_page_objnum = dict_direct_int(dict, "O").filter(|&o| o > 0)? as u32;
        let page_count = dict_direct_int(dict, "N").filter(|&n| n > 0)? as u32;
        let first_page_end = dict_direct_int(dict, "E").filter(|&e| e > 0)? as u64;
        let first_page_no = dict_direct_int(dict, "P").unwrap_or(0).max(0) as u32;

        Some(Self {
            file_size,
            last_xref_offset,
            first_page_objnum,
            page_count,
            first_page_end,
            first_page_no,
        })
    }

}
