//! Page manifest and reorder engine
//!
//! The manifest is the user's current arrangement of a document's pages:
//! an ordered list of entries, each pointing back at the page's position in
//! the original document. All operations here are pure and synchronous.
//!
//! Invariants held after every mutation:
//! - `display_index` of entry `k` is `k`
//! - every `source_index` is unique and below the original page count

use crate::error::{Result, ToolboxError};
use serde::Serialize;

/// Cached rendering of a page, carried along with its entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    #[serde(skip)]
    pub image: Vec<u8>,
    pub mime: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    display_index: usize,
    source_index: usize,
    preview: Option<Preview>,
}

impl ManifestEntry {
    pub fn display_index(&self) -> usize {
        self.display_index
    }

    /// Position of this page in the original document
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageManifest {
    entries: Vec<ManifestEntry>,
    page_count: usize,
}

impl PageManifest {
    /// One entry per page, in document order
    pub fn for_document(page_count: usize) -> Self {
        let entries = (0..page_count)
            .map(|i| ManifestEntry {
                display_index: i,
                source_index: i,
                preview: None,
            })
            .collect();
        Self {
            entries,
            page_count,
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Page count of the document the manifest was created for
    pub fn original_page_count(&self) -> usize {
        self.page_count
    }

    /// Source page indices in display order; this is the output order
    pub fn source_order(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.source_index).collect()
    }

    /// Remove the entry at `from` and reinsert it at `to`.
    ///
    /// Splice semantics: `to` is interpreted after the removal, so moving to
    /// `len - 1` places the entry last.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.renumber();
        Ok(())
    }

    /// Remove the entry at `display_index` and return it
    pub fn delete(&mut self, display_index: usize) -> Result<ManifestEntry> {
        self.check_index(display_index)?;
        let removed = self.entries.remove(display_index);
        self.renumber();
        Ok(removed)
    }

    /// Attach a cached preview to an entry
    pub fn set_preview(&mut self, display_index: usize, preview: Preview) -> Result<()> {
        self.check_index(display_index)?;
        self.entries[display_index].preview = Some(preview);
        Ok(())
    }

    /// Drop every entry and cached preview
    pub fn reset(&mut self) {
        self.entries.clear();
        self.page_count = 0;
    }

    fn renumber(&mut self) {
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            entry.display_index = idx;
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(ToolboxError::InvalidRange(format!(
                "Position {} is out of range (manifest has {} pages)",
                index,
                self.entries.len()
            )));
        }
        Ok(())
    }
}

/// State of one drag gesture over a manifest.
///
/// Each time the dragged entry crosses another position, `drag_over` moves
/// it there and follows it, so consecutive crossings compose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragSession {
    dragged: Option<usize>,
}

impl DragSession {
    pub fn start(display_index: usize) -> Self {
        Self {
            dragged: Some(display_index),
        }
    }

    /// Current position of the dragged entry, if a drag is active
    pub fn dragged(&self) -> Option<usize> {
        self.dragged
    }

    pub fn drag_over(&mut self, manifest: &mut PageManifest, display_index: usize) -> Result<()> {
        let Some(from) = self.dragged else {
            return Ok(());
        };
        if from == display_index {
            return Ok(());
        }
        manifest.move_entry(from, display_index)?;
        self.dragged = Some(display_index);
        Ok(())
    }

    pub fn end(&mut self) {
        self.dragged = None;
    }
}
