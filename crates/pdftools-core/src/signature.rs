//! Place a signature image on one page
//!
//! The signature sits in the bottom-right corner: its right edge 50pt from
//! the page's right edge, its bottom 50pt above the page's bottom edge.

use crate::document::{media_box, DocumentHandle};
use crate::error::{Result, ToolboxError};
use crate::images::{draw_image_content, embed_png};
use crate::naming;
use crate::page_content::{add_resource, append_content};
use crate::sink::Deliverable;
use lopdf::Object;
use tracing::info;

const CORNER_MARGIN: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureOptions {
    /// 1-based
    pub page_number: usize,
    /// Drawn width in points; height follows the image's aspect ratio
    pub width: f32,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            page_number: 1,
            width: 150.0,
        }
    }
}

/// Draw a PNG signature on the chosen page of an opened document
pub fn apply_signature(
    handle: &mut DocumentHandle,
    signature_png: &[u8],
    options: &SignatureOptions,
) -> Result<()> {
    if signature_png.is_empty() {
        return Err(ToolboxError::MissingInput("Upload a signature image".into()));
    }
    if options.page_number == 0 || options.page_number > handle.page_count() {
        return Err(ToolboxError::InvalidRange(format!(
            "Page {} does not exist (document has {} pages)",
            options.page_number,
            handle.page_count()
        )));
    }
    if options.width <= 0.0 {
        return Err(ToolboxError::InvalidRange(format!(
            "Signature width must be positive, got {}",
            options.width
        )));
    }

    let page_id = handle.page_id(options.page_number - 1)?;
    let doc = handle.document_mut();
    let image = embed_png(doc, signature_png)?;
    let height = image.scaled_height(options.width);

    let [_, lly, urx, _] = media_box(doc, page_id)?;
    let x = urx - options.width - CORNER_MARGIN;
    let y = lly + CORNER_MARGIN;

    let name = add_resource(doc, page_id, "XObject", "Sig", Object::Reference(image.id))?;
    append_content(
        doc,
        page_id,
        draw_image_content(&name, x, y, options.width, height),
    )?;
    Ok(())
}

/// Sign and serialize as `signed.pdf`
pub fn sign_document(
    pdf: &[u8],
    signature_png: &[u8],
    options: &SignatureOptions,
) -> Result<Deliverable> {
    if signature_png.is_empty() {
        return Err(ToolboxError::MissingInput("Upload a signature image".into()));
    }
    let mut handle = DocumentHandle::open(pdf)?;
    apply_signature(&mut handle, signature_png, options)?;
    info!("Signed page {}", options.page_number);
    Ok(Deliverable::pdf(handle.to_bytes()?, naming::SIGNED))
}
