//! Document handle
//!
//! Thin owner of a parsed `lopdf::Document` that exposes pages by 0-based
//! index and serializes back to bytes. Every workflow opens its inputs
//! through this type.

use crate::error::{Result, ToolboxError};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Guard against malformed page trees whose `Parent` chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page has no MediaBox anywhere in its ancestry
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// An opened PDF document
pub struct DocumentHandle {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl DocumentHandle {
    /// Parse PDF bytes into a handle
    pub fn open(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(ToolboxError::UnsupportedFormat(
                "Not a PDF file (missing %PDF- header)".into(),
            ));
        }

        let doc = Document::load_mem(bytes).map_err(|e| {
            ToolboxError::LocalProcessingFailed(format!("Failed to parse PDF: {}", e))
        })?;

        if doc.is_encrypted() {
            return Err(ToolboxError::LocalProcessingFailed(
                "Encrypted PDF files are not supported".into(),
            ));
        }

        Ok(Self::from_document(doc))
    }

    /// Create a document with an empty page tree
    pub fn empty() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(0)),
            ("Kids", Object::Array(Vec::new())),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            doc,
            pages: Vec::new(),
        }
    }

    pub(crate) fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page object ids in document order
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    /// Object id of the page at a 0-based index
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages.get(index).copied().ok_or_else(|| {
            ToolboxError::InvalidRange(format!(
                "Page index {} does not exist (document has {} pages)",
                index,
                self.pages.len()
            ))
        })
    }

    /// Effective rotation of a page in degrees, normalized to 0..360
    pub fn rotation(&self, index: usize) -> Result<i64> {
        let page_id = self.page_id(index)?;
        let rotation = inherited_attribute(&self.doc, page_id, b"Rotate")
            .and_then(|obj| resolve(&self.doc, obj).ok())
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        Ok(normalize_rotation(rotation))
    }

    /// Page width and height in points, taken from the MediaBox
    pub fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        let page_id = self.page_id(index)?;
        let media_box = media_box(&self.doc, page_id)?;
        Ok((
            (media_box[2] - media_box[0]).abs(),
            (media_box[3] - media_box[1]).abs(),
        ))
    }

    /// Serialize the document
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).map_err(|e| {
            ToolboxError::LocalProcessingFailed(format!("Failed to save PDF: {}", e))
        })?;
        Ok(buffer)
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Object id of the root `Pages` node
    pub(crate) fn pages_root(&self) -> Result<ObjectId> {
        let catalog_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| ToolboxError::LocalProcessingFailed("No Root in trailer".into()))?;
        self.doc
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|_| ToolboxError::LocalProcessingFailed("No Pages in catalog".into()))
    }

    /// Replace the root page list. Every kid must already be a page object
    /// whose `Parent` points at the root.
    pub(crate) fn set_page_list(&mut self, kids: Vec<ObjectId>) -> Result<()> {
        let pages_id = self.pages_root()?;
        let pages_dict = self.doc.get_object_mut(pages_id)?.as_dict_mut()?;
        pages_dict.set(
            "Kids",
            Object::Array(kids.iter().map(|&id| Object::Reference(id)).collect()),
        );
        pages_dict.set("Count", Object::Integer(kids.len() as i64));
        self.pages = kids;
        Ok(())
    }

    /// Add a new page dictionary at the end of the document
    pub(crate) fn append_page(&mut self, mut page: Dictionary) -> Result<ObjectId> {
        let pages_id = self.pages_root()?;
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        let page_id = self.doc.add_object(page);

        let mut kids = self.pages.clone();
        kids.push(page_id);
        self.set_page_list(kids)?;
        Ok(page_id)
    }
}

/// Follow one level of indirection
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up the `Parent` chain for the
/// inheritable ones (MediaBox, CropBox, Resources, Rotate).
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(obj) => parse_box_array(resolve(doc, obj)?.as_array()?),
        None => Ok(DEFAULT_MEDIA_BOX),
    }
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Result<[f32; 4]> {
    if array.len() != 4 {
        return Err(ToolboxError::LocalProcessingFailed(
            "MediaBox must have 4 elements".into(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f32,
            Object::Real(n) => *n,
            _ => {
                return Err(ToolboxError::LocalProcessingFailed(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

/// Normalize rotation to 0, 90, 180, or 270
pub(crate) fn normalize_rotation(angle: i64) -> i64 {
    angle.rem_euclid(360)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_pdf;

    #[test]
    fn test_open_reports_page_count() {
        let pdf = create_test_pdf(4, "Doc");
        let handle = DocumentHandle::open(&pdf).unwrap();
        assert_eq!(handle.page_count(), 4);
        assert_eq!(handle.page_ids().len(), 4);
    }

    #[test]
    fn test_open_rejects_non_pdf_bytes() {
        let result = DocumentHandle::open(b"PK\x03\x04 definitely a zip");
        assert!(matches!(result, Err(ToolboxError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_open_rejects_corrupt_pdf() {
        let result = DocumentHandle::open(b"%PDF-1.7\ngarbage without xref");
        assert!(matches!(result, Err(ToolboxError::LocalProcessingFailed(_))));
    }

    #[test]
    fn test_page_id_out_of_range() {
        let pdf = create_test_pdf(2, "Doc");
        let handle = DocumentHandle::open(&pdf).unwrap();
        assert!(handle.page_id(1).is_ok());
        assert!(matches!(
            handle.page_id(2),
            Err(ToolboxError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_page_size_reads_media_box() {
        let pdf = create_test_pdf(1, "Doc");
        let handle = DocumentHandle::open(&pdf).unwrap();
        assert_eq!(handle.page_size(0).unwrap(), (612.0, 792.0));
    }

    #[test]
    fn test_empty_document_roundtrips() {
        let mut handle = DocumentHandle::empty();
        assert_eq!(handle.page_count(), 0);
        let bytes = handle.to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_append_page_updates_page_tree() {
        let mut handle = DocumentHandle::empty();
        handle.append_page(Dictionary::new()).unwrap();
        handle.append_page(Dictionary::new()).unwrap();
        assert_eq!(handle.page_count(), 2);

        let bytes = handle.to_bytes().unwrap();
        let reopened = Document::load_mem(&bytes).unwrap();
        assert_eq!(reopened.get_pages().len(), 2);
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(90), 90);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
    }

    #[test]
    fn test_parse_box_array() {
        let array = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ];
        assert_eq!(parse_box_array(&array).unwrap(), [0.0, 0.0, 612.0, 792.0]);
        assert!(parse_box_array(&array[..3]).is_err());
    }
}
