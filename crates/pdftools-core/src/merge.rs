//! Merge
//!
//! Concatenates whole documents in upload order.

use crate::document::DocumentHandle;
use crate::error::{Result, ToolboxError};
use crate::input::InputFile;
use crate::naming;
use crate::reconstruct::{reconstruct, PageSelection};
use crate::sink::Deliverable;
use tracing::info;

/// Merge already opened documents, every page of each, in the given order
pub fn merge_documents(documents: &[DocumentHandle]) -> Result<DocumentHandle> {
    if documents.len() < 2 {
        return Err(ToolboxError::MissingInput(
            "Select at least 2 PDF files to merge".into(),
        ));
    }

    let selections: Vec<PageSelection<'_>> =
        documents.iter().map(PageSelection::all).collect();
    reconstruct(&selections)
}

/// Validate, open and merge uploaded files into `merged.pdf`
pub fn merge_files(files: &[InputFile]) -> Result<Deliverable> {
    if files.len() < 2 {
        return Err(ToolboxError::MissingInput(
            "Select at least 2 PDF files to merge".into(),
        ));
    }
    for file in files {
        file.require_pdf()?;
    }

    // Opened one at a time, strictly in upload order
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let handle = DocumentHandle::open(&file.bytes).map_err(|e| match e {
            ToolboxError::LocalProcessingFailed(msg) => {
                ToolboxError::LocalProcessingFailed(format!("{}: {}", file.name, msg))
            }
            other => other,
        })?;
        documents.push(handle);
    }

    let mut merged = merge_documents(&documents)?;
    info!(
        "Merged {} files into {} pages",
        files.len(),
        merged.page_count()
    );
    Ok(Deliverable::pdf(merged.to_bytes()?, naming::MERGED))
}
