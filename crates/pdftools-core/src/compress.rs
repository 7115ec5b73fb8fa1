//! Re-save a document smaller
//!
//! Drops unreachable objects and empty streams, renumbers what is left and
//! Flate-compresses every stream that allows it.

use crate::document::DocumentHandle;
use crate::error::Result;
use crate::naming;
use crate::sink::Deliverable;
use serde::Serialize;
use tracing::info;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Sizes before and after compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    pub original_size: usize,
    pub compressed_size: usize,
}

impl CompressionReport {
    /// Rounded percentage saved; negative when the output grew.
    /// 0 when either size is 0.
    pub fn savings_percent(&self) -> i64 {
        if self.original_size == 0 || self.compressed_size == 0 {
            return 0;
        }
        let saved = self.original_size as f64 - self.compressed_size as f64;
        (saved / self.original_size as f64 * 100.0).round() as i64
    }
}

/// Human readable size in base-1024 units, at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[exponent])
}

/// Compress an opened document in place
pub fn compress_handle(handle: &mut DocumentHandle) {
    let doc = handle.document_mut();
    doc.prune_objects();
    doc.delete_zero_length_streams();
    doc.renumber_objects();
    doc.compress();
}

/// Compress and serialize as `compressed.pdf`
pub fn compress_document(pdf: &[u8]) -> Result<(Deliverable, CompressionReport)> {
    let mut handle = DocumentHandle::open(pdf)?;
    compress_handle(&mut handle);
    let bytes = handle.to_bytes()?;

    let report = CompressionReport {
        original_size: pdf.len(),
        compressed_size: bytes.len(),
    };
    info!(
        "Compressed {} -> {} ({}% saved)",
        format_file_size(report.original_size as u64),
        format_file_size(report.compressed_size as u64),
        report.savings_percent()
    );
    Ok((Deliverable::pdf(bytes, naming::COMPRESSED), report))
}
