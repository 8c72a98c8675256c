//! Object-stream (ObjStm) resolution through the document.

mod common;

use common::{PdfBuilder, encode_v5_entries};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;
use sucre_core::document::{ObjectKind, PdfDocument};
use sucre_core::{Object, PdfError};

/// Build a document whose objects 10 and 11 live compressed inside
/// object stream 4, with a Flate-compressed body.
fn objstm_doc() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let off1 = builder.add_object(1, "<< /Type /Catalog /Describes 10 0 R >>");

    let header = "10 0 11 22 ";
    let body = format!("{header}<< /Kind /Archived >> (second member)");
    let first = header.len();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();
    let off4 = builder.add_stream(
        4,
        &format!("<< /Type /ObjStm /N 2 /First {first} /Filter /FlateDecode >>"),
        &compressed,
    );

    let xref_offset = builder.offset();
    let records = [
        (1u8, off1 as u32, 0u32), // 1
        (1, off4 as u32, 0),      // 4
        (1, xref_offset as u32, 0), // 5 (this xref stream)
        (2, 4, 0),                // 10 -> archive 4, index 0
        (2, 4, 1),                // 11 -> archive 4, index 1
    ];
    let data = encode_v5_entries(&records, (1, 4, 2));
    builder.add_stream(
        5,
        "<< /Type /XRef /Size 12 /W [1 4 2] /Index [1 1 4 2 10 2] /Root 1 0 R >>",
        &data,
    );
    builder.write_startxref(xref_offset);
    builder.buf
}

#[test]
fn members_resolve_through_the_archive() {
    let doc = PdfDocument::new(&objstm_doc(), "").expect("parse");
    assert_eq!(doc.object_kind(4), Some(ObjectKind::ObjStream));
    assert_eq!(doc.object_kind(10), Some(ObjectKind::Compressed));

    let member = doc.get_object(10).expect("member 0");
    assert_eq!(
        member.as_dict().unwrap().get("Kind").unwrap().as_name().unwrap(),
        "Archived"
    );
    assert_eq!(
        doc.get_object(11).unwrap(),
        Object::String(b"second member".to_vec())
    );
}

#[test]
fn archive_is_parsed_once_and_cached() {
    let doc = PdfDocument::new(&objstm_doc(), "").expect("parse");
    // Both members come from the same cached archive; repeated access
    // works and stays consistent.
    for _ in 0..3 {
        assert!(doc.get_object(10).is_ok());
        assert!(doc.get_object(11).is_ok());
    }
}

#[test]
fn archive_that_is_not_a_stream_fails_gracefully() {
    let mut raw = objstm_doc();
    // Corrupt the ObjStm keyword so the archive no longer qualifies.
    let pos = raw
        .windows(b"/Type /ObjStm".len())
        .position(|w| w == b"/Type /ObjStm")
        .expect("objstm dict");
    raw[pos..pos + b"/Type /ObjStm".len()].copy_from_slice(b"/Type /ObjStX");

    let doc = PdfDocument::new(&raw, "").expect("parse");
    assert!(matches!(
        doc.get_object(10),
        Err(PdfError::ObjectNotFound(10))
    ));
    // The archive object itself still resolves as a plain stream.
    assert!(doc.get_object(4).is_ok());
}

#[test]
fn resolving_the_container_directly_works() {
    let doc = PdfDocument::new(&objstm_doc(), "").expect("parse");
    let archive = doc.get_object(4).expect("container");
    assert_eq!(archive.as_stream().unwrap().type_name(), Some("ObjStm"));
}
