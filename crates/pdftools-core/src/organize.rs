//! Organize workflow
//!
//! Holds one loaded document and the user's page manifest for it. Pages are
//! moved and deleted on the manifest only; the document itself is rebuilt
//! from the manifest when saved.

use crate::document::DocumentHandle;
use crate::error::{Result, ToolboxError};
use crate::input::InputFile;
use crate::manifest::{DragSession, PageManifest, Preview};
use crate::naming;
use crate::reconstruct::{reconstruct, PageSelection};
use crate::render::{RenderOptions, RendererHandle};
use crate::sink::Deliverable;
use tracing::{info, warn};

struct LoadedDocument {
    name: String,
    bytes: Vec<u8>,
    handle: DocumentHandle,
}

/// One organize session
#[derive(Default)]
pub struct OrganizeSession {
    document: Option<LoadedDocument>,
    manifest: PageManifest,
    previews: Option<RendererHandle>,
}

impl OrganizeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session that renders a thumbnail for every page on load
    pub fn with_previews(renderer: RendererHandle) -> Self {
        Self {
            previews: Some(renderer),
            ..Self::default()
        }
    }

    /// Load a document, replacing whatever was loaded before.
    /// Returns the page count.
    pub fn load(&mut self, file: &InputFile) -> Result<usize> {
        file.require_pdf()?;
        let handle = DocumentHandle::open(&file.bytes)?;
        let page_count = handle.page_count();

        self.reset();
        self.manifest = PageManifest::for_document(page_count);
        self.document = Some(LoadedDocument {
            name: file.name.clone(),
            bytes: file.bytes.clone(),
            handle,
        });
        self.render_previews();

        info!("Loaded {} for organizing ({} pages)", file.name, page_count);
        Ok(page_count)
    }

    /// A preview that fails to render leaves its entry without one
    fn render_previews(&mut self) {
        let (Some(renderer), Some(document)) = (&self.previews, &self.document) else {
            return;
        };
        let renderer = match renderer.renderer() {
            Ok(renderer) => renderer,
            Err(e) => {
                warn!("Page previews unavailable: {}", e);
                return;
            }
        };

        let options = RenderOptions::preview();
        for index in 0..self.manifest.len() {
            match renderer.render_page(&document.bytes, index, &options) {
                Ok(image) => {
                    let preview = Preview {
                        image,
                        mime: options.format.mime(),
                    };
                    store_preview(&mut self.manifest, index, preview);
                }
                Err(e) => warn!("Preview of page {} failed: {}", index + 1, e),
            }
        }
    }

    pub fn manifest(&self) -> &PageManifest {
        &self.manifest
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        self.manifest.move_entry(from, to)
    }

    pub fn delete_page(&mut self, display_index: usize) -> Result<()> {
        self.manifest.delete(display_index).map(|_| ())
    }

    /// Begin dragging the entry at `display_index`
    pub fn start_drag(&self, display_index: usize) -> Result<DragSession> {
        if display_index >= self.manifest.len() {
            return Err(ToolboxError::InvalidRange(format!(
                "Cannot drag position {} (manifest has {} pages)",
                display_index,
                self.manifest.len()
            )));
        }
        Ok(DragSession::start(display_index))
    }

    /// The dragged entry crossed `display_index`
    pub fn drag_over(&mut self, drag: &mut DragSession, display_index: usize) -> Result<()> {
        drag.drag_over(&mut self.manifest, display_index)
    }

    /// Rebuild the document in manifest order as `organized.pdf`.
    ///
    /// The session is left as is; call [`reset`](Self::reset) to discard it.
    pub fn save(&self) -> Result<Deliverable> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| ToolboxError::MissingInput("No PDF loaded".into()))?;
        if self.manifest.is_empty() {
            return Err(ToolboxError::MissingInput(
                "All pages were deleted; nothing to save".into(),
            ));
        }

        let selection = PageSelection::new(&document.handle, self.manifest.source_order());
        let mut output = reconstruct(&[selection])?;
        info!(
            "Organized {} into {} pages",
            document.name,
            output.page_count()
        );
        Ok(Deliverable::pdf(output.to_bytes()?, naming::ORGANIZED))
    }

    /// Drop the document, the manifest and every cached preview
    pub fn reset(&mut self) {
        self.manifest.reset();
        self.document = None;
    }
}

fn store_preview(manifest: &mut PageManifest, index: usize, preview: Preview) {
    if let Err(e) = manifest.set_preview(index, preview) {
        warn!("Dropped preview of page {}: {}", index + 1, e);
    }
}
