//! Drives the `pdftools` binary against PDFs built on the fly

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::Document;
use pdftools_core::testing::{create_test_jpeg, create_test_pdf, create_test_png, page_markers};
use predicates::prelude::*;
use pretty_assertions::assert_eq;

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn write_pdf(dir: &Path, name: &str, num_pages: u32, prefix: &str) -> PathBuf {
    write_file(dir, name, &create_test_pdf(num_pages, prefix))
}

fn markers(path: &Path) -> Vec<String> {
    page_markers(&std::fs::read(path).unwrap())
}

fn pdftools(out_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pdftools").unwrap();
    cmd.arg("--out-dir").arg(out_dir);
    cmd
}

#[test]
fn test_merge() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 2, "A");
    let b = write_pdf(dir.path(), "b.pdf", 1, "B");

    pdftools(dir.path())
        .arg("merge")
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("merged.pdf"));

    assert_eq!(
        markers(&dir.path().join("merged.pdf")),
        vec!["A-Page-1", "A-Page-2", "B-Page-1"]
    );
}

#[test]
fn test_merge_single_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_pdf(dir.path(), "a.pdf", 2, "A");

    pdftools(dir.path()).arg("merge").arg(&a).assert().failure();
    assert!(!dir.path().join("merged.pdf").exists());
}

#[test]
fn test_split() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_pdf(dir.path(), "source.pdf", 3, "S");

    pdftools(dir.path()).arg("split").arg(&source).assert().success();

    for n in 1..=3 {
        let page = dir.path().join(format!("page-{}.pdf", n));
        assert_eq!(markers(&page), vec![format!("S-Page-{}", n)]);
    }
}

#[test]
fn test_organize_applies_edits_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_pdf(dir.path(), "source.pdf", 4, "O");

    // Delete first, then move: [1,2,3,4] -> [2,3,4] -> [4,2,3]
    pdftools(dir.path())
        .arg("organize")
        .arg(&source)
        .args(["--delete", "0", "--move", "2:0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Page order: 4, 2, 3"));

    assert_eq!(
        markers(&dir.path().join("organized.pdf")),
        vec!["O-Page-4", "O-Page-2", "O-Page-3"]
    );
}

#[test]
fn test_rotate_rejects_odd_angles() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_pdf(dir.path(), "source.pdf", 1, "R");

    pdftools(dir.path())
        .arg("rotate")
        .arg(&source)
        .args(["--degrees", "45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("0, 90, 180 or 270"));
}

#[test]
fn test_rotate() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_pdf(dir.path(), "source.pdf", 2, "R");

    pdftools(dir.path())
        .arg("rotate")
        .arg(&source)
        .args(["--degrees", "180"])
        .assert()
        .success();

    let doc = Document::load(dir.path().join("rotated-180-degrees.pdf")).unwrap();
    for (_, id) in doc.get_pages() {
        let page = doc.get_dictionary(id).unwrap();
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 180);
    }
}

#[test]
fn test_compress_reports_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_pdf(dir.path(), "source.pdf", 2, "C");

    pdftools(dir.path())
        .arg("compress")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Original:").and(predicate::str::contains("Saved:")));

    assert!(dir.path().join("compressed.pdf").exists());
}

#[test]
fn test_watermark_requires_text() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_pdf(dir.path(), "source.pdf", 1, "W");

    pdftools(dir.path())
        .arg("watermark")
        .arg(&source)
        .args(["--text", "   "])
        .assert()
        .failure();
}

#[test]
fn test_images_to_pdf_skips_other_files() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_file(dir.path(), "scan.png", &create_test_png(120, 90, true));
    let notes = write_file(dir.path(), "notes.txt", b"not an image");
    let jpeg = write_file(dir.path(), "photo.jpg", &create_test_jpeg(40, 60, false));

    pdftools(dir.path())
        .arg("images-to-pdf")
        .arg(&png)
        .arg(&notes)
        .arg(&jpeg)
        .assert()
        .success()
        .stdout(predicate::str::contains("converted-images.pdf"))
        .stderr(predicate::str::contains("Skipped notes.txt"));

    let doc = Document::load(dir.path().join("converted-images.pdf")).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}
