//! Linearized (fast-web-view) entry path: first-page xref first, main
//! chain deferred until requested.

mod common;

use common::PdfBuilder;
use sucre_core::document::PdfDocument;
use sucre_core::{Object, PdfError};

/// Overwrite a 6-digit placeholder following `key` (e.g. "/T ").
fn patch_number(buf: &mut [u8], key: &str, value: u64) {
    let needle = format!("{key}000000");
    let pos = buf
        .windows(needle.len())
        .position(|w| w == needle.as_bytes())
        .unwrap_or_else(|| panic!("placeholder {key} not found"));
    let formatted = format!("{value:06}");
    buf[pos + key.len()..pos + needle.len()].copy_from_slice(formatted.as_bytes());
}

/// A linearized file: linearization dict + first-page objects (highest
/// object numbers) + first-page xref up front; main objects + main xref
/// behind them. Returns the raw bytes.
fn linearized_doc() -> Vec<u8> {
    let mut buf = b"%PDF-1.5\n".to_vec();

    // Object 6: linearization dictionary (first object in the file).
    let off6 = buf.len() as u64;
    buf.extend_from_slice(
        b"6 0 obj\n<< /Linearized 1 /L 000000 /O 4 /E 000512 /N 1 /T 000000 >>\nendobj\n",
    );
    // First-page objects: catalog and page tree.
    let off4 = buf.len() as u64;
    buf.extend_from_slice(b"4 0 obj\n<< /Type /Catalog /Pages 5 0 R >>\nendobj\n");
    let off5 = buf.len() as u64;
    buf.extend_from_slice(b"5 0 obj\n<< /Type /Pages /Kids [] /Count 1 >>\nendobj\n");

    // First-page xref: object 0 plus the top object numbers 4..6.
    let first_xref = buf.len() as u64;
    buf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f\r\n4 3\n");
    for off in [off4, off5, off6] {
        buf.extend_from_slice(format!("{off:010} 00000 n\r\n").as_bytes());
    }
    buf.extend_from_slice(b"trailer\n<< /Size 7 /Root 4 0 R /Prev 000000 >>\n");
    buf.extend_from_slice(format!("startxref\n{first_xref}\n%%EOF\n").as_bytes());

    // Main-section objects, loaded only on demand.
    let off1 = buf.len() as u64;
    buf.extend_from_slice(b"1 0 obj\n(main one)\nendobj\n");
    let off2 = buf.len() as u64;
    buf.extend_from_slice(b"2 0 obj\n(main two)\nendobj\n");
    let off3 = buf.len() as u64;
    buf.extend_from_slice(b"3 0 obj\n(main three)\nendobj\n");

    let main_xref = buf.len() as u64;
    buf.extend_from_slice(b"xref\n1 3\n");
    for off in [off1, off2, off3] {
        buf.extend_from_slice(format!("{off:010} 00000 n\r\n").as_bytes());
    }
    buf.extend_from_slice(b"trailer\n<< /Size 7 /Root 4 0 R >>\n");

    patch_number(&mut buf, "/T ", first_xref);
    patch_number(&mut buf, "/Prev ", main_xref);
    let total = buf.len() as u64;
    patch_number(&mut buf, "/L ", total);
    buf
}

#[test]
fn first_page_loads_before_the_main_chain() {
    let data = linearized_doc();
    let mut doc = PdfDocument::new_linearized(&data, "").expect("parse");

    let header = doc.linearized().expect("linearization header").clone();
    assert_eq!(header.first_page_objnum, 4);
    assert_eq!(header.page_count, 1);

    // First-page objects are available immediately.
    assert!(doc.root().is_ok());
    assert!(doc.get_object(5).is_ok());
    // Main-section objects are not loaded yet.
    assert!(matches!(
        doc.get_object(2),
        Err(PdfError::ObjectNotFound(2))
    ));

    doc.load_main_xref().expect("main chain");
    assert_eq!(
        doc.get_object(2).unwrap(),
        Object::String(b"main two".to_vec())
    );
    assert!(doc.get_object(1).is_ok());
    // First-page entries survive the merge.
    assert!(doc.root().is_ok());
}

#[test]
fn non_linearized_files_fall_through_to_standard_parse() {
    let mut builder = PdfBuilder::new();
    builder.add_object(1, "<< /Type /Catalog >>");
    builder.add_object(2, "(ordinary)");
    builder.write_xref("/Root 1 0 R");

    let doc = PdfDocument::new_linearized(&builder.buf, "").expect("parse");
    assert!(doc.linearized().is_none());
    assert!(doc.root().is_ok());
    assert_eq!(
        doc.get_object(2).unwrap(),
        Object::String(b"ordinary".to_vec())
    );
}

#[test]
fn linearized_with_broken_first_page_xref_recovers() {
    let mut data = linearized_doc();
    // Smash the first-page xref keyword; the entry path must still
    // produce a usable document (rebuild fallback).
    let pos = data
        .windows(5)
        .position(|w| w == b"xref\n")
        .expect("first xref");
    data[pos..pos + 4].copy_from_slice(b"xrfe");

    let doc = PdfDocument::new_linearized(&data, "").expect("parse");
    assert!(doc.xref_was_rebuilt());
    assert!(doc.root().is_ok());
}
