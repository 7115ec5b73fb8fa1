//! Input files and format sniffing
//!
//! Acceptance is decided purely from the declared MIME type and the file
//! extension, never from the content.

use crate::error::{Result, ToolboxError};
use std::path::Path;

pub const PDF_MIME: &str = "application/pdf";

pub const IMAGE_MIMES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

pub const SPREADSHEET_MIMES: [&str; 3] = [
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel.sheet.macroEnabled.12",
];

pub const SPREADSHEET_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];

/// A file the user picked
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl InputFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            bytes,
        }
    }

    /// Read a file from disk; the MIME type is inferred from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ToolboxError::MissingInput(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_for_extension(&name).map(str::to_string);
        Ok(Self { name, mime, bytes })
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    fn mime_is(&self, candidates: &[&str]) -> bool {
        self.mime
            .as_deref()
            .is_some_and(|m| candidates.iter().any(|c| c.eq_ignore_ascii_case(m)))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_is(&[PDF_MIME]) || self.extension().as_deref() == Some("pdf")
    }

    pub fn image_kind(&self) -> Option<ImageKind> {
        match self.mime.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("image/png") => return Some(ImageKind::Png),
            Some("image/jpeg") | Some("image/jpg") => return Some(ImageKind::Jpeg),
            _ => {}
        }
        match self.extension().as_deref() {
            Some("png") => Some(ImageKind::Png),
            Some("jpg") | Some("jpeg") => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        self.mime_is(&SPREADSHEET_MIMES)
            || self
                .extension()
                .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Reject anything that is not a PDF
    pub fn require_pdf(&self) -> Result<()> {
        if self.is_pdf() {
            Ok(())
        } else {
            Err(ToolboxError::UnsupportedFormat(format!(
                "{} is not a PDF file",
                self.name
            )))
        }
    }

    pub fn require_spreadsheet(&self) -> Result<()> {
        if self.is_spreadsheet() {
            Ok(())
        } else {
            Err(ToolboxError::UnsupportedFormat(format!(
                "{} is not an Excel file (.xlsx, .xls, .xlsm)",
                self.name
            )))
        }
    }
}

/// Conversion input format for a spreadsheet name; `xlsx` when the name
/// carries no recognised extension
pub fn spreadsheet_format(file_name: &str) -> &'static str {
    match extension_of(file_name).as_deref() {
        Some("xls") => "xls",
        Some("xlsm") => "xlsm",
        _ => "xlsx",
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn mime_for_extension(name: &str) -> Option<&'static str> {
    match extension_of(name)?.as_str() {
        "pdf" => Some(PDF_MIME),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "xls" => Some(SPREADSHEET_MIMES[0]),
        "xlsx" => Some(SPREADSHEET_MIMES[1]),
        "xlsm" => Some(SPREADSHEET_MIMES[2]),
        _ => None,
    }
}
