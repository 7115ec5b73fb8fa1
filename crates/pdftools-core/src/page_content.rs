//! Page-level overlay helpers
//!
//! Drawing on an existing page means two things: registering a resource
//! (font, image, graphics state) under a name the page does not use yet, and
//! appending a content stream after the page's own content.

use crate::document::{inherited_attribute, resolve};
use crate::error::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// The page's effective resources as an owned dictionary
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(obj) => Ok(resolve(doc, obj)?.as_dict()?.clone()),
        None => Ok(Dictionary::new()),
    }
}

/// Register `value` under `/Resources/<category>` with a fresh name starting
/// with `prefix`, and return that name.
///
/// The page gets its own inline copy of its resources, so sibling pages that
/// shared the original dictionary are unaffected.
pub(crate) fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    value: Object,
) -> Result<String> {
    let mut resources = effective_resources(doc, page_id)?;
    let mut entries = match resources.get(category.as_bytes()) {
        Ok(obj) => resolve(doc, obj)?.as_dict()?.clone(),
        Err(_) => Dictionary::new(),
    };

    let mut n = 1;
    let name = loop {
        let candidate = format!("{}{}", prefix, n);
        if !entries.has(candidate.as_bytes()) {
            break candidate;
        }
        n += 1;
    };

    entries.set(name.clone(), value);
    resources.set(category, Object::Dictionary(entries));
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Resources", Object::Dictionary(resources));
    Ok(name)
}

/// Append `content` after the page's existing content.
///
/// The existing content is wrapped in `q`/`Q` so a graphics state it leaves
/// behind cannot leak into the overlay.
pub(crate) fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Contents") {
            Ok(obj) => match resolve(doc, obj)? {
                Object::Array(items) => items.clone(),
                _ => vec![obj.clone()],
            },
            Err(_) => Vec::new(),
        }
    };

    let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save));
    contents.extend(existing);
    contents.push(Object::Reference(restore));
    contents.push(Object::Reference(overlay));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}
