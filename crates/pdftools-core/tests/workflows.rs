//! End-to-end workflows through the public API only

use pdftools_core::{
    compress_document, merge_files, rotate_document, split_and_deliver, DirectorySink,
    DocumentHandle, InputFile, MemorySink, OrganizeSession, Rotation, SplitOptions, ToolboxError,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[allow(dead_code)]
#[path = "../src/testing.rs"]
mod testing;

use testing::{create_test_pdf, page_markers};

fn pdf_input(name: &str, bytes: Vec<u8>) -> InputFile {
    InputFile::new(name, Some("application/pdf"), bytes)
}

#[test]
fn test_merge_keeps_selection_order() {
    let merged = merge_files(&[
        pdf_input("a.pdf", create_test_pdf(2, "A")),
        pdf_input("b.pdf", create_test_pdf(3, "B")),
    ])
    .unwrap();

    assert_eq!(merged.filename, "merged.pdf");
    assert_eq!(
        page_markers(&merged.bytes),
        vec!["A-Page-1", "A-Page-2", "B-Page-1", "B-Page-2", "B-Page-3"]
    );
}

#[test]
fn test_merge_needs_two_documents() {
    let err = merge_files(&[pdf_input("a.pdf", create_test_pdf(2, "A"))]).unwrap_err();
    assert!(matches!(err, ToolboxError::MissingInput(_)));
}

#[tokio::test(start_paused = true)]
async fn test_split_delivers_one_file_per_page() {
    let source = DocumentHandle::open(&create_test_pdf(3, "S")).unwrap();
    let mut sink = MemorySink::new();

    let count = split_and_deliver(&source, &mut sink, SplitOptions::default())
        .await
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(sink.filenames(), vec!["page-1.pdf", "page-2.pdf", "page-3.pdf"]);
    for (i, delivered) in sink.delivered.iter().enumerate() {
        assert_eq!(page_markers(&delivered.bytes), vec![format!("S-Page-{}", i + 1)]);
    }
}

#[tokio::test]
async fn test_split_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = DocumentHandle::open(&create_test_pdf(2, "D")).unwrap();
    let mut sink = DirectorySink::new(dir.path());

    split_and_deliver(
        &source,
        &mut sink,
        SplitOptions {
            pause: Duration::ZERO,
        },
    )
    .await
    .unwrap();

    let second = std::fs::read(dir.path().join("page-2.pdf")).unwrap();
    assert_eq!(page_markers(&second), vec!["D-Page-2"]);
}

#[test]
fn test_rotate_sets_exact_angle() {
    let rotated = rotate_document(&create_test_pdf(2, "R"), Rotation::Clockwise90).unwrap();
    assert_eq!(rotated.filename, "rotated-90-degrees.pdf");

    let handle = DocumentHandle::open(&rotated.bytes).unwrap();
    assert_eq!(handle.rotation(0).unwrap(), 90);
    assert_eq!(handle.rotation(1).unwrap(), 90);

    // Rotating again sets the angle, it does not add to it
    let again = rotate_document(&rotated.bytes, Rotation::Clockwise90).unwrap();
    let handle = DocumentHandle::open(&again.bytes).unwrap();
    assert_eq!(handle.rotation(0).unwrap(), 90);
}

#[test]
fn test_organize_reorder_and_delete() {
    let mut session = OrganizeSession::new();
    let pages = session
        .load(&pdf_input("report.pdf", create_test_pdf(4, "O")))
        .unwrap();
    assert_eq!(pages, 4);

    session.move_page(3, 0).unwrap();
    session.delete_page(2).unwrap();

    let saved = session.save().unwrap();
    assert_eq!(saved.filename, "organized.pdf");
    assert_eq!(page_markers(&saved.bytes), vec!["O-Page-4", "O-Page-1", "O-Page-3"]);
}

#[test]
fn test_organize_with_every_page_deleted() {
    let mut session = OrganizeSession::new();
    session
        .load(&pdf_input("one.pdf", create_test_pdf(1, "X")))
        .unwrap();
    session.delete_page(0).unwrap();

    let err = session.save().unwrap_err();
    assert!(matches!(err, ToolboxError::MissingInput(_)));
}

#[test]
fn test_compress_reports_sizes() {
    let original = create_test_pdf(3, "C");
    let (output, report) = compress_document(&original).unwrap();

    assert_eq!(output.filename, "compressed.pdf");
    assert_eq!(report.original_size, original.len());
    assert_eq!(report.compressed_size, output.bytes.len());
    assert_eq!(page_markers(&output.bytes), vec!["C-Page-1", "C-Page-2", "C-Page-3"]);
}
