//! Cross-reference stream (V5) loading: field widths, /Index segments,
//! compressed entries, /Prev chains, and hybrid-reference files.

mod common;

use common::{PdfBuilder, encode_v5_entries};
use sucre_core::document::{ObjectKind, PdfDocument};
use sucre_core::{Object, PdfError};

#[test]
fn basic_stream_table_parses() {
    let mut builder = PdfBuilder::new();
    builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.add_object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
    builder.write_xref_stream(3, "/Root 1 0 R");

    let doc = PdfDocument::new(&builder.buf, "").expect("parse");
    assert!(doc.xref_is_stream());
    assert!(!doc.xref_was_rebuilt());
    assert!(doc.root().is_ok());
    assert_eq!(doc.object_kind(1), Some(ObjectKind::Normal));
}

/// Build a document whose xref stream uses /W [1 2 1] and carries two
/// compressed members inside an object stream.
fn compressed_doc(archive_objnum_in_entry: u32) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let off1 = builder.add_object(1, "<< /Type /Catalog /Info 5 0 R >>");

    // Object stream (object 4) holding objects 5 and 6.
    let member5 = b"<< /Producer (sucre) >>";
    let member6 = b"(inside archive)";
    let header = format!("5 0 6 {} ", member5.len() + 1);
    let mut body = header.clone().into_bytes();
    body.extend_from_slice(member5);
    body.push(b' ');
    body.extend_from_slice(member6);
    let first = header.len();
    let off4 = builder.add_stream(
        4,
        &format!("<< /Type /ObjStm /N 2 /First {first} >>"),
        &body,
    );

    // Xref stream (object 7), W [1 2 1].
    let xref_offset = builder.offset();
    let records = [
        (0u8, 0u32, 65535u32),                  // 0: free
        (1, off1 as u32, 0),                    // 1: catalog
        (1, off4 as u32, 0),                    // 4: the archive
        (2, archive_objnum_in_entry, 0),        // 5: compressed, index 0
        (2, archive_objnum_in_entry, 1),        // 6: compressed, index 1
        (1, xref_offset as u32, 0),             // 7: this xref stream
    ];
    let data = encode_v5_entries(&records, (1, 2, 1));
    builder.add_stream(
        7,
        "<< /Type /XRef /Size 8 /W [1 2 1] /Index [0 2 4 4] /Root 1 0 R >>",
        &data,
    );
    builder.write_startxref(xref_offset);
    builder.buf
}

#[test]
fn compressed_entries_delegate_to_their_archive() {
    let doc = PdfDocument::new(compressed_doc(4), "").expect("parse");
    assert_eq!(doc.object_kind(4), Some(ObjectKind::ObjStream));
    assert_eq!(doc.object_kind(5), Some(ObjectKind::Compressed));

    let info = doc.get_object(5).expect("member 0");
    assert_eq!(
        info.as_dict().unwrap().get("Producer").unwrap(),
        &Object::String(b"sucre".to_vec())
    );
    assert_eq!(
        doc.get_object(6).unwrap(),
        Object::String(b"inside archive".to_vec())
    );
    // Second resolution comes from the archive cache.
    assert!(doc.get_object(6).is_ok());
}

#[test]
fn invalid_archive_number_fails_gracefully() {
    // Archive object number far beyond the table: resolution of the
    // compressed members must yield not-found, never a crash.
    let doc = PdfDocument::new(compressed_doc(7000), "").expect("parse");
    assert!(matches!(
        doc.get_object(5),
        Err(PdfError::ObjectNotFound(5))
    ));
    assert!(doc.get_object(1).is_ok());
}

#[test]
fn zero_width_type_field_defaults_to_in_use() {
    let mut builder = PdfBuilder::new();
    let off1 = builder.add_object(1, "<< /Type /Catalog >>");
    let xref_offset = builder.offset();
    // W [0 4 2]: no type field; every record is implicitly type 1.
    let mut data = Vec::new();
    for (f2, f3) in [(0u32, 65535u32), (off1 as u32, 0), (xref_offset as u32, 0)] {
        common::push_be(&mut data, f2, 4);
        common::push_be(&mut data, f3, 2);
    }
    builder.add_stream(
        2,
        "<< /Type /XRef /Size 3 /W [0 4 2] /Index [0 1 1 2] /Root 1 0 R >>",
        &data,
    );
    builder.write_startxref(xref_offset);

    let doc = PdfDocument::new(&builder.buf, "").expect("parse");
    assert!(doc.root().is_ok());
    // Object 0's "free" record was read as an in-use entry at offset 0;
    // it resolves to nothing but must not break the load.
    assert!(doc.get_object(1).is_ok());
}

#[test]
fn prev_chain_keeps_newer_entries() {
    let mut builder = PdfBuilder::new();
    builder.add_object(1, "<< /Type /Catalog >>");
    builder.add_object(2, "(old value)");
    builder.write_xref_stream(3, "/Root 1 0 R");
    // Incremental update rewrites object 2 through a second stream.
    builder.add_object(2, "(new value)");
    builder.write_xref_stream(4, "/Root 1 0 R");

    let doc = PdfDocument::new(&builder.buf, "").expect("parse");
    assert!(doc.xref_is_stream());
    assert_eq!(
        doc.get_object(2).unwrap(),
        Object::String(b"new value".to_vec())
    );
    assert!(doc.get_object(1).is_ok());
}

#[test]
fn cyclic_stream_prev_chain_is_detected() {
    let mut builder = PdfBuilder::new();
    builder.add_object(1, "<< /Type /Catalog >>");
    builder.add_object(2, "(payload)");

    // Xref stream whose /Prev points at itself: the chain can never end.
    let self_offset = builder.offset();
    let entries = encode_v5_entries(&[(1, self_offset as u32, 0)], (1, 4, 2));
    builder.add_stream(
        9,
        &format!(
            "<< /Type /XRef /Size 10 /W [1 4 2] /Index [9 1] /Prev {self_offset} /Root 1 0 R >>"
        ),
        &entries,
    );
    builder.write_startxref(self_offset);

    let doc = PdfDocument::new(&builder.buf, "").expect("must not hang");
    // The self-referential chain fails and the rebuild takes over; the
    // XRef stream's dictionary still serves as the trailer.
    assert!(doc.xref_was_rebuilt());
    assert!(doc.root().is_ok());
    assert_eq!(
        doc.get_object(2).unwrap(),
        Object::String(b"payload".to_vec())
    );
}

#[test]
fn hybrid_file_consults_the_xref_stream() {
    let mut builder = PdfBuilder::new();
    let off1 = builder.add_object(1, "<< /Type /Catalog /Info 4 0 R >>");

    // Object 4 lives only in the hybrid xref stream, not in the classic
    // table.
    let off4 = builder.add_object(4, "(hybrid only)");
    let stm_offset = builder.offset();
    let records = [(1u8, off4 as u32, 0u32), (1, stm_offset as u32, 0)];
    let data = encode_v5_entries(&records, (1, 4, 2));
    builder.add_stream(
        5,
        "<< /Type /XRef /Size 6 /W [1 4 2] /Index [4 2] /Root 1 0 R >>",
        &data,
    );

    // Classic section covering objects 0..1, with /XRefStm.
    let xref_offset = builder.offset();
    builder.push_raw(b"xref\n0 2\n0000000000 65535 f\r\n");
    builder.push_raw(format!("{off1:010} 00000 n\r\n").as_bytes());
    builder.push_raw(
        format!("trailer\n<< /Size 6 /Root 1 0 R /XRefStm {stm_offset} >>\n").as_bytes(),
    );
    builder.write_startxref(xref_offset);

    let doc = PdfDocument::new(&builder.buf, "").expect("parse");
    assert!(!doc.xref_was_rebuilt());
    assert!(doc.root().is_ok());
    assert_eq!(
        doc.get_object(4).unwrap(),
        Object::String(b"hybrid only".to_vec())
    );
}
