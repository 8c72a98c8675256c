//! Cross-reference rebuild: a forward scan of the whole byte stream.
//!
//! Used when structured loading fails. The scan trusts nothing but the
//! bytes: it tracks the last two number words to recognize `N G obj`
//! triples, re-parses each candidate strictly, collects inline and
//! XRef-stream trailers, registers object-stream members, and skips
//! string literals so keywords embedded in data cannot mislead it.
//!
//! The scanner is resumable: long scans check a caller-supplied pause
//! indicator between bounded word batches and can be continued in place,
//! which is what incremental loaders drive directly.

use super::objstream::ObjectStream;
use super::xref::{MAX_OBJECT_NUMBER, XrefTable};
use crate::codec::filters;
use crate::model::{Object, StreamObject};
use crate::parser::{Lexer, ObjectParser};
use bytes::Bytes;

/// Cooperative cancellation for long operations.
pub trait PauseIndicator {
    fn need_to_pause_now(&self) -> bool;
}

/// Outcome of one `scan` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// The pause indicator fired; call `scan` again to continue.
    Paused,
    /// The scan reached end of input.
    Done,
}

/// Words processed between pause checks.
const PAUSE_CHECK_INTERVAL: u32 = 512;

pub struct RebuildScanner<'a> {
    data: &'a [u8],
    pos: usize,
    /// Last two number words seen: (value, start offset).
    numbers: Vec<(u32, u64)>,
    table: XrefTable,
    found_trailer: bool,
    finished: bool,
}

impl<'a> RebuildScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            numbers: Vec::with_capacity(2),
            table: XrefTable::new(),
            found_trailer: false,
            finished: false,
        }
    }

    /// Run the scan until end of input or until `pause` fires.
    pub fn scan(&mut self, pause: Option<&dyn PauseIndicator>) -> ScanStatus {
        if self.finished {
            return ScanStatus::Done;
        }
        let mut lexer = Lexer::new(self.data);
        lexer.set_pos(self.pos);
        let mut words_since_check = 0u32;

        while let Some(word) = lexer.next_word() {
            if word.is_number {
                if let Some(value) = word.as_u32() {
                    self.numbers.push((value, word.pos as u64));
                    if self.numbers.len() > 2 {
                        self.numbers.remove(0);
                    }
                }
            } else {
                match word.word.as_slice() {
                    b"(" => lexer.skip_string(),
                    b"<" => lexer.skip_hex_string(),
                    b"trailer" => self.process_trailer(&mut lexer),
                    b"obj" if self.numbers.len() == 2 => self.process_object(&mut lexer),
                    _ => {}
                }
                self.numbers.clear();
            }

            words_since_check += 1;
            if words_since_check >= PAUSE_CHECK_INTERVAL {
                words_since_check = 0;
                if let Some(pause) = pause
                    && pause.need_to_pause_now()
                {
                    self.pos = lexer.pos();
                    return ScanStatus::Paused;
                }
            }
        }

        self.pos = lexer.pos();
        self.finished = true;
        ScanStatus::Done
    }

    /// Consume the scan. Succeeds only when a trailer was found and at
    /// least one object entry exists.
    pub fn finish(self) -> Option<XrefTable> {
        debug_assert!(self.finished);
        if self.found_trailer && !self.table.is_empty() {
            log::warn!("rebuilt xref table with {} entries", self.table.len());
            Some(self.table)
        } else {
            log::warn!("rebuild failed: trailer or object entries missing");
            None
        }
    }

    fn process_trailer(&mut self, lexer: &mut Lexer<'a>) {
        let mut parser = ObjectParser::new_at(self.data, lexer.pos());
        if let Ok(Object::Dict(dict)) = parser.parse_object() {
            let layer = XrefTable::with_trailer(dict, 0);
            self.merge_layer(layer);
            self.found_trailer = true;
            lexer.set_pos(parser.pos());
        }
    }

    fn process_object(&mut self, lexer: &mut Lexer<'a>) {
        let (obj_num, obj_pos) = self.numbers[0];
        let gen_num = self.numbers[1].0;

        let parsed = parse_indirect_strict(self.data, obj_pos as usize);
        if let Some(ref indirect) = parsed {
            // Continue scanning after the object so stream bodies cannot
            // feed fake keywords into the scan.
            lexer.set_pos(indirect.end_pos);

            if let Object::Stream(stream) = &indirect.body
                && stream.type_name() == Some("XRef")
            {
                // The stream's dictionary is an authoritative trailer owned
                // by this object number.
                let layer = XrefTable::with_trailer(stream.attrs.clone(), obj_num);
                self.merge_layer(layer);
                self.found_trailer = true;
            }
        }

        if obj_num >= MAX_OBJECT_NUMBER {
            return;
        }
        // Registered even when the strict re-parse failed: the offset is
        // still the best available guess for this object number. Later
        // occurrences of the same number overwrite earlier ones.
        self.table.add_normal(obj_num, gen_num, obj_pos);

        if let Some(indirect) = parsed
            && let Object::Stream(stream) = indirect.body
            && let Ok(decoded) = decode_direct(&stream)
            && let Some(archive) = ObjectStream::create(&stream, Bytes::from(decoded))
        {
            for (index, &(member, _)) in archive.object_info().iter().enumerate() {
                if member < MAX_OBJECT_NUMBER {
                    self.table.add_compressed(member, obj_num, index as u32);
                }
            }
        }
    }

    fn merge_layer(&mut self, layer: XrefTable) {
        let table = std::mem::take(&mut self.table);
        self.table = XrefTable::merge_up(table, layer);
    }
}

pub(crate) struct IndirectObject {
    pub objnum: u32,
    pub genno: u32,
    pub body: Object,
    /// Position just past `endobj`/`endstream`.
    pub end_pos: usize,
}

/// Strictly parse `N G obj <body> endobj` at `pos`, with stream bodies
/// delimited by an `endstream` scan (no /Length resolution is possible
/// while the table is being rebuilt).
pub(crate) fn parse_indirect_strict(data: &[u8], pos: usize) -> Option<IndirectObject> {
    let mut lexer = Lexer::new(data);
    lexer.set_pos(pos);

    let objnum = lexer.next_word()?.as_u32()?;
    let genno = lexer.next_word()?.as_u32()?;
    if lexer.next_word()?.word != b"obj" {
        return None;
    }

    let mut parser = ObjectParser::new_at(data, lexer.pos());
    let body = parser.parse_object().ok()?;
    lexer.set_pos(parser.pos());

    let mut word = lexer.next_word();
    let body = if let (Object::Dict(dict), Some(w)) = (&body, &word)
        && w.word == b"stream"
    {
        let mut start = w.pos + b"stream".len();
        if data.get(start) == Some(&b'\r') {
            start += 1;
        }
        if data.get(start) == Some(&b'\n') {
            start += 1;
        }
        let body_len = find_endstream(&data[start.min(data.len())..])?;
        let end = start + body_len;
        let mut stream =
            StreamObject::new(dict.clone(), Bytes::copy_from_slice(&data[start..end]));
        stream.set_identity(objnum, genno);
        lexer.set_pos(end);
        let endstream = lexer.next_word()?;
        if endstream.word != b"endstream" {
            return None;
        }
        word = lexer.next_word();
        Object::Stream(Box::new(stream))
    } else {
        body
    };

    if word?.word != b"endobj" {
        return None;
    }

    Some(IndirectObject {
        objnum,
        genno,
        body,
        end_pos: lexer.pos(),
    })
}

/// Distance to the `endstream` keyword, trimming the EOL that precedes it.
pub(crate) fn find_endstream(data: &[u8]) -> Option<usize> {
    let needle = b"endstream";
    let mut offset = data
        .windows(needle.len())
        .position(|window| window == needle)?;
    if offset > 0 && data[offset - 1] == b'\n' {
        offset -= 1;
    }
    if offset > 0 && data[offset - 1] == b'\r' {
        offset -= 1;
    }
    Some(offset)
}

/// Decode a stream body using only direct /Filter and /DecodeParms
/// values. Rebuild runs without a resolver, so indirect filter entries
/// cannot be honored; streams without filters pass through.
pub(crate) fn decode_direct(stream: &StreamObject) -> crate::error::Result<Vec<u8>> {
    let Some(filter) = stream.get("Filter") else {
        return Ok(stream.rawdata().to_vec());
    };
    let names = filters::filter_names(filter);
    let parms = stream.get("DecodeParms");
    let mut data = stream.rawdata().to_vec();
    for (index, name) in names.iter().enumerate() {
        data = filters::decode(&data, name, filters::parms_at(parms, index))?;
    }
    Ok(data)
}
