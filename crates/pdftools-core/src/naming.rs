//! Output file names. These are user-facing and fixed per workflow.

use crate::input::SPREADSHEET_EXTENSIONS;

pub const MERGED: &str = "merged.pdf";
pub const ORGANIZED: &str = "organized.pdf";
pub const COMPRESSED: &str = "compressed.pdf";
pub const WATERMARKED: &str = "watermarked.pdf";
pub const SIGNED: &str = "signed.pdf";
pub const CONVERTED_IMAGES: &str = "converted-images.pdf";

/// `page-{n}.pdf`, 1-based
pub fn split_page(page_number: usize) -> String {
    format!("page-{}.pdf", page_number)
}

pub fn rotated(degrees: u16) -> String {
    format!("rotated-{}-degrees.pdf", degrees)
}

/// `page-{n}.{extension}`, 1-based
pub fn page_image(page_number: usize, extension: &str) -> String {
    format!("page-{}.{}", page_number, extension)
}

/// Replace a trailing spreadsheet extension (any case) with `.pdf`.
/// Names without one get `.pdf` appended.
pub fn spreadsheet_pdf(file_name: &str) -> String {
    if let Some(dot) = file_name.rfind('.') {
        let ext = &file_name[dot + 1..];
        if SPREADSHEET_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
        {
            return format!("{}.pdf", &file_name[..dot]);
        }
    }
    format!("{}.pdf", file_name)
}
