//! Shared helpers for building synthetic PDF byte streams with correct
//! offsets. Tests construct documents programmatically so that the xref
//! positions are exact by construction, then corrupt them deliberately
//! where a test needs malformed input.
#![allow(dead_code)]

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub enum Entry {
    InUse { offset: u64, genno: u32 },
    Free { genno: u32 },
}

pub struct PdfBuilder {
    pub buf: Vec<u8>,
    /// Entries accumulated since the last xref section was written.
    pending: BTreeMap<u32, Entry>,
    last_xref: Option<u64>,
    max_objnum: u32,
    wrote_first_xref: bool,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            buf: b"%PDF-1.5\n".to_vec(),
            pending: BTreeMap::new(),
            last_xref: None,
            max_objnum: 0,
            wrote_first_xref: false,
        }
    }

    pub fn offset(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn push_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append `N 0 obj <body> endobj`, registering its offset.
    pub fn add_object(&mut self, objnum: u32, body: &str) -> u64 {
        self.add_object_gen(objnum, 0, body)
    }

    pub fn add_object_gen(&mut self, objnum: u32, genno: u32, body: &str) -> u64 {
        let offset = self.offset();
        self.buf
            .extend_from_slice(format!("{objnum} {genno} obj\n{body}\nendobj\n").as_bytes());
        self.pending.insert(objnum, Entry::InUse { offset, genno });
        self.max_objnum = self.max_objnum.max(objnum);
        offset
    }

    /// Append a stream object; `dict` must include `<< >>` but not
    /// /Length, which is added from the body size.
    pub fn add_stream(&mut self, objnum: u32, dict: &str, data: &[u8]) -> u64 {
        let offset = self.offset();
        let dict = dict
            .trim_end()
            .strip_suffix(">>")
            .expect("dict must end with >>");
        self.buf.extend_from_slice(
            format!("{objnum} 0 obj\n{dict} /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self.pending.insert(objnum, Entry::InUse { offset, genno: 0 });
        self.max_objnum = self.max_objnum.max(objnum);
        offset
    }

    /// Mark an object number free (classic `f` entry) in the next
    /// section.
    pub fn free_object(&mut self, objnum: u32, genno: u32) {
        self.pending.insert(objnum, Entry::Free { genno });
        self.max_objnum = self.max_objnum.max(objnum);
    }

    /// Write a classic xref section covering the pending entries, a
    /// trailer (`extra` supplies /Root etc.), `startxref`, and `%%EOF`.
    /// Returns the section's offset. Later calls chain via /Prev.
    pub fn write_xref(&mut self, trailer_extra: &str) -> u64 {
        let xref_offset = self.offset();
        let mut entries = std::mem::take(&mut self.pending);
        if !self.wrote_first_xref {
            entries.entry(0).or_insert(Entry::Free { genno: 65535 });
        }

        self.buf.extend_from_slice(b"xref\n");
        let mut run: Vec<(u32, Entry)> = Vec::new();
        let mut flush = |buf: &mut Vec<u8>, run: &mut Vec<(u32, Entry)>| {
            if run.is_empty() {
                return;
            }
            buf.extend_from_slice(format!("{} {}\n", run[0].0, run.len()).as_bytes());
            for (_, entry) in run.iter() {
                let line = match entry {
                    Entry::InUse { offset, genno } => format!("{offset:010} {genno:05} n\r\n"),
                    Entry::Free { genno } => format!("{:010} {genno:05} f\r\n", 0),
                };
                buf.extend_from_slice(line.as_bytes());
            }
            run.clear();
        };
        for (objnum, entry) in entries {
            if let Some(&(last, _)) = run.last()
                && objnum != last + 1
            {
                flush(&mut self.buf, &mut run);
            }
            run.push((objnum, entry));
        }
        flush(&mut self.buf, &mut run);

        self.write_trailer_and_eof(xref_offset, trailer_extra);
        xref_offset
    }

    fn write_trailer_and_eof(&mut self, xref_offset: u64, trailer_extra: &str) {
        let size = self.max_objnum + 1;
        let prev = match self.last_xref {
            Some(prev) => format!(" /Prev {prev}"),
            None => String::new(),
        };
        self.buf.extend_from_slice(
            format!("trailer\n<< /Size {size}{prev} {trailer_extra} >>\n").as_bytes(),
        );
        self.write_startxref(xref_offset);
        self.last_xref = Some(xref_offset);
        self.wrote_first_xref = true;
    }

    pub fn write_startxref(&mut self, offset: u64) {
        self.buf
            .extend_from_slice(format!("startxref\n{offset}\n%%EOF\n").as_bytes());
    }

    /// Write a cross-reference stream object covering the pending
    /// entries with `/W [1 4 2]`, then `startxref` and `%%EOF`.
    /// `dict_extra` lands in the stream dictionary (e.g. "/Root 1 0 R").
    pub fn write_xref_stream(&mut self, objnum: u32, dict_extra: &str) -> u64 {
        let mut entries = std::mem::take(&mut self.pending);
        let stream_offset = self.offset();
        entries.insert(
            objnum,
            Entry::InUse {
                offset: stream_offset,
                genno: 0,
            },
        );
        self.max_objnum = self.max_objnum.max(objnum);

        let records: Vec<(u8, u32, u32)> = entries
            .iter()
            .map(|(_, entry)| match entry {
                Entry::InUse { offset, genno } => (1u8, *offset as u32, *genno),
                Entry::Free { genno } => (0u8, 0, *genno),
            })
            .collect();
        let index: Vec<(u32, u32)> = contiguous_segments(entries.keys().copied());
        let size = self.max_objnum + 1;
        let prev = match self.last_xref {
            Some(prev) => format!(" /Prev {prev}"),
            None => String::new(),
        };
        let index_str = index
            .iter()
            .map(|(s, c)| format!("{s} {c}"))
            .collect::<Vec<_>>()
            .join(" ");
        let data = encode_v5_entries(&records, (1, 4, 2));
        let dict = format!(
            "<< /Type /XRef /Size {size} /W [1 4 2] /Index [{index_str}]{prev} {dict_extra} >>"
        );
        let offset = self.add_stream(objnum, &dict, &data);
        assert_eq!(offset, stream_offset);
        self.pending.clear();
        self.write_startxref(stream_offset);
        self.last_xref = Some(stream_offset);
        self.wrote_first_xref = true;
        stream_offset
    }
}

/// Group ascending object numbers into `(start, count)` runs.
pub fn contiguous_segments(numbers: impl Iterator<Item = u32>) -> Vec<(u32, u32)> {
    let mut segments: Vec<(u32, u32)> = Vec::new();
    for n in numbers {
        match segments.last_mut() {
            Some((start, count)) if *start + *count == n => *count += 1,
            _ => segments.push((n, 1)),
        }
    }
    segments
}

/// Encode `(type, field2, field3)` records big-endian with the given
/// field widths.
pub fn encode_v5_entries(records: &[(u8, u32, u32)], w: (usize, usize, usize)) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * (w.0 + w.1 + w.2));
    for &(t, f2, f3) in records {
        push_be(&mut out, u32::from(t), w.0);
        push_be(&mut out, f2, w.1);
        push_be(&mut out, f3, w.2);
    }
    out
}

pub fn push_be(out: &mut Vec<u8>, value: u32, width: usize) {
    for i in (0..width).rev() {
        out.push((value >> (8 * i)) as u8);
    }
}

/// Legacy (R3) standard-security values for building encrypted fixtures:
/// returns (O, U, file key) for a document where owner and user password
/// are the same.
pub mod crypt {
    use sucre_core::codec::rc4::Rc4;

    const PASSWORD_PADDING: [u8; 32] = [
        0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
        0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
        0x69, 0x7A,
    ];

    fn pad(password: &[u8]) -> [u8; 32] {
        let mut padded = [0u8; 32];
        let len = password.len().min(32);
        padded[..len].copy_from_slice(&password[..len]);
        padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
        padded
    }

    pub fn r3_values(password: &[u8], p: u32, docid: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        // O (Algorithm 3.3), owner password == user password.
        let mut hash = md5::compute(pad(password)).0.to_vec();
        for _ in 0..50 {
            hash = md5::compute(&hash).0.to_vec();
        }
        let okey = &hash[..16];
        let mut o = pad(password).to_vec();
        for i in 0..20u8 {
            let xor_key: Vec<u8> = okey.iter().map(|b| b ^ i).collect();
            o = Rc4::new(&xor_key).apply(&o);
        }

        // File key (Algorithm 3.2, 128-bit).
        let mut ctx = md5::Context::new();
        ctx.consume(pad(password));
        ctx.consume(&o);
        ctx.consume(p.to_le_bytes());
        ctx.consume(docid);
        let mut key = ctx.finalize().0.to_vec();
        for _ in 0..50 {
            key = md5::compute(&key[..16]).0.to_vec();
        }
        key.truncate(16);

        // U (Algorithm 3.5).
        let mut ctx = md5::Context::new();
        ctx.consume(PASSWORD_PADDING);
        ctx.consume(docid);
        let hash = ctx.finalize();
        let mut u = Rc4::new(&key).apply(&hash.0);
        for i in 1..20u8 {
            let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            u = Rc4::new(&xor_key).apply(&u);
        }
        let mut padded = u.clone();
        padded.extend_from_slice(&u);
        padded.truncate(32);

        (o, padded, key)
    }

    /// Encrypt bytes for a given object with the legacy RC4 scheme.
    pub fn r3_encrypt(file_key: &[u8], objnum: u32, genno: u32, data: &[u8]) -> Vec<u8> {
        let mut key_data = file_key.to_vec();
        key_data.extend_from_slice(&objnum.to_le_bytes()[..3]);
        key_data.extend_from_slice(&genno.to_le_bytes()[..2]);
        let hash = md5::compute(&key_data);
        let key_len = (file_key.len() + 5).min(16);
        Rc4::new(&hash.0[..key_len]).apply(data)
    }
}
