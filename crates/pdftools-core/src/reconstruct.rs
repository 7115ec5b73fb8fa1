//! Document reconstruction by selective page copy
//!
//! Builds a fresh document out of pages picked from one or more sources.
//! Organize, merge and split are all expressed as a list of selections.
//!
//! The algorithm, per selection:
//! 1. Flatten inheritable attributes onto each selected page
//! 2. Import the objects those pages reach into the target with an id offset,
//!    stopping at page tree nodes
//! 3. Re-parent the selected pages under the target's page tree
//!
//! Once all selections are in, the page list is written in selection order
//! and whatever the selected pages do not reach is pruned. A link that points
//! at a page left out of the output keeps a dangling reference, which readers
//! resolve to null.

use crate::document::{inherited_attribute, DocumentHandle};
use crate::error::{Result, ToolboxError};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Ordered pages to take from one source document
pub struct PageSelection<'a> {
    pub source: &'a DocumentHandle,
    /// 0-based page indices, in output order
    pub pages: Vec<usize>,
}

impl<'a> PageSelection<'a> {
    pub fn new(source: &'a DocumentHandle, pages: Vec<usize>) -> Self {
        Self { source, pages }
    }

    /// Every page, in document order
    pub fn all(source: &'a DocumentHandle) -> Self {
        Self {
            source,
            pages: (0..source.page_count()).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        let count = self.source.page_count();
        let mut seen = HashSet::with_capacity(self.pages.len());
        for &index in &self.pages {
            if index >= count {
                return Err(ToolboxError::InvalidRange(format!(
                    "Page {} does not exist (document has {} pages)",
                    index + 1,
                    count
                )));
            }
            if !seen.insert(index) {
                return Err(ToolboxError::InvalidRange(format!(
                    "Page {} is selected more than once",
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

/// Build a new document holding copies of the selected pages, in order.
///
/// Sources are never mutated. An empty selection list, or one in which every
/// selection is empty, is rejected rather than producing an empty document.
pub fn reconstruct(selections: &[PageSelection<'_>]) -> Result<DocumentHandle> {
    if selections.iter().all(|s| s.pages.is_empty()) {
        return Err(ToolboxError::MissingInput(
            "No pages selected for the output document".into(),
        ));
    }
    for selection in selections {
        selection.validate()?;
    }

    let mut target = DocumentHandle::empty();
    let pages_root = target.pages_root()?;
    let mut kids = Vec::new();

    for selection in selections.iter().filter(|s| !s.pages.is_empty()) {
        let source = selection.source.document();
        let id_offset = target.document().max_id;

        let pages = selection
            .pages
            .iter()
            .map(|&index| {
                let page_id = selection.source.page_id(index)?;
                Ok((page_id, flattened_page(source, page_id)?))
            })
            .collect::<Result<Vec<_>>>()?;

        import_reachable(target.document_mut(), source, &pages, id_offset);

        for (source_page, page) in pages {
            let mut page = remap_object_refs(Object::Dictionary(page), id_offset);
            page.as_dict_mut()?.set("Parent", Object::Reference(pages_root));
            let new_page_id = (source_page.0 + id_offset, source_page.1);
            target.document_mut().objects.insert(new_page_id, page);
            kids.push(new_page_id);
        }

        debug!(
            "Copied {} of {} pages (id offset {})",
            selection.pages.len(),
            selection.source.page_count(),
            id_offset
        );
    }

    target.set_page_list(kids)?;
    let pruned = target.document_mut().prune_objects();
    debug!("Pruned {} unreachable objects", pruned.len());

    Ok(target)
}

/// Copy the objects reachable from `pages` into `dest`, shifting ids by
/// `id_offset`. Other page tree nodes are never entered, so neither the
/// source's page tree nor pages outside the selection come along.
fn import_reachable(
    dest: &mut Document,
    source: &Document,
    pages: &[(ObjectId, Dictionary)],
    id_offset: u32,
) {
    let mut pending = Vec::new();
    for (_, page) in pages {
        collect_refs(&Object::Dictionary(page.clone()), &mut pending);
    }

    let mut seen = HashSet::new();
    let mut imported = 0usize;
    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Ok(object) = source.get_object(id) else {
            continue;
        };
        if is_page_tree_node(object) {
            continue;
        }
        collect_refs(object, &mut pending);
        dest.objects.insert(
            (id.0 + id_offset, id.1),
            remap_object_refs(object.clone(), id_offset),
        );
        imported += 1;
    }

    dest.max_id = dest.max_id.max(source.max_id + id_offset);
    debug!("Imported {} objects for {} pages", imported, pages.len());
}

fn is_page_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|kind| kind.as_name().ok())
        .is_some_and(|name| name == b"Page" || name == b"Pages")
}

/// Push every indirect reference held by `object`
fn collect_refs(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, value)| collect_refs(value, out)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, value)| collect_refs(value, out)),
        _ => {}
    }
}

/// Clone a source page with inherited attributes made explicit. The result
/// is still in the source's id space and has no `Parent`.
fn flattened_page(source: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = source.get_dictionary(page_id)?.clone();
    for key in INHERITABLE_KEYS {
        if !page.has(key) {
            if let Some(value) = inherited_attribute(source, page_id, key) {
                page.set(key, value.clone());
            }
        }
    }
    page.remove(b"Parent");
    Ok(page)
}

/// Recursively shift every indirect reference by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                let inner = std::mem::replace(value, Object::Null);
                *value = remap_object_refs(inner, offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                let inner = std::mem::replace(value, Object::Null);
                *value = remap_object_refs(inner, offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PageManifest;
    use crate::testing::{create_test_pdf, page_markers};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn open(pages: u32, prefix: &str) -> DocumentHandle {
        DocumentHandle::open(&create_test_pdf(pages, prefix)).unwrap()
    }

    #[test]
    fn test_reconstruct_follows_selection_order() {
        let source = open(4, "S");
        let mut output = reconstruct(&[PageSelection::new(&source, vec![3, 0, 2])]).unwrap();

        assert_eq!(output.page_count(), 3);
        let markers = page_markers(&output.to_bytes().unwrap());
        assert_eq!(markers, vec!["S-Page-4", "S-Page-1", "S-Page-3"]);
    }

    #[test]
    fn test_reconstruct_concatenates_selections() {
        let a = open(2, "A");
        let b = open(3, "B");
        let mut output =
            reconstruct(&[PageSelection::all(&a), PageSelection::all(&b)]).unwrap();

        let markers = page_markers(&output.to_bytes().unwrap());
        assert_eq!(
            markers,
            vec!["A-Page-1", "A-Page-2", "B-Page-1", "B-Page-2", "B-Page-3"]
        );
    }

    #[test]
    fn test_same_source_can_be_selected_twice() {
        let a = open(2, "A");
        let mut output =
            reconstruct(&[PageSelection::all(&a), PageSelection::new(&a, vec![0])]).unwrap();

        let markers = page_markers(&output.to_bytes().unwrap());
        assert_eq!(markers, vec!["A-Page-1", "A-Page-2", "A-Page-1"]);
    }

    #[test]
    fn test_empty_selection_is_missing_input() {
        let source = open(2, "S");
        let result = reconstruct(&[PageSelection::new(&source, vec![])]);
        assert!(matches!(result, Err(ToolboxError::MissingInput(_))));

        let result = reconstruct(&[]);
        assert!(matches!(result, Err(ToolboxError::MissingInput(_))));
    }

    #[test]
    fn test_out_of_range_page_is_rejected() {
        let source = open(2, "S");
        let result = reconstruct(&[PageSelection::new(&source, vec![0, 2])]);
        assert!(matches!(result, Err(ToolboxError::InvalidRange(_))));
    }

    #[test]
    fn test_duplicate_page_is_rejected() {
        let source = open(2, "S");
        let result = reconstruct(&[PageSelection::new(&source, vec![1, 1])]);
        assert!(matches!(result, Err(ToolboxError::InvalidRange(_))));
    }

    #[test]
    fn test_inherited_media_box_is_flattened() {
        let source = open(1, "S");
        let output = reconstruct(&[PageSelection::all(&source)]).unwrap();

        let page_id = output.page_id(0).unwrap();
        let page = output.document().get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert_eq!(output.page_size(0).unwrap(), (612.0, 792.0));
    }

    #[test]
    fn test_source_is_not_mutated() {
        let source = open(3, "S");
        let before = source.document().objects.len();
        let _ = reconstruct(&[PageSelection::new(&source, vec![2])]).unwrap();
        assert_eq!(source.document().objects.len(), before);
        assert_eq!(source.page_count(), 3);
    }

    #[test]
    fn test_unselected_pages_are_pruned() {
        let source = open(5, "S");
        let mut output = reconstruct(&[PageSelection::new(&source, vec![1])]).unwrap();
        let bytes = output.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("S-Page-2"));
        assert!(!text.contains("S-Page-4"));
    }

    /// Source where page 1 carries a link annotation targeting page 3
    fn open_with_link() -> DocumentHandle {
        let mut doc = Document::load_mem(&create_test_pdf(3, "L")).unwrap();
        let pages = doc.get_pages();
        let (first, third) = (pages[&1], pages[&3]);
        let link = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Annot".to_vec())),
            ("Subtype", Object::Name(b"Link".to_vec())),
            (
                "Rect",
                Object::Array(vec![
                    Object::Integer(50),
                    Object::Integer(690),
                    Object::Integer(200),
                    Object::Integer(710),
                ]),
            ),
            (
                "Dest",
                Object::Array(vec![
                    Object::Reference(third),
                    Object::Name(b"Fit".to_vec()),
                ]),
            ),
        ]));
        doc.get_object_mut(first)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Annots", Object::Array(vec![Object::Reference(link)]));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        DocumentHandle::open(&bytes).unwrap()
    }

    fn link_target(output: &DocumentHandle, index: usize) -> ObjectId {
        let doc = output.document();
        let page = doc.get_dictionary(output.page_id(index).unwrap()).unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        let link = doc
            .get_dictionary(annots[0].as_reference().unwrap())
            .unwrap();
        link.get(b"Dest").unwrap().as_array().unwrap()[0]
            .as_reference()
            .unwrap()
    }

    #[test]
    fn test_link_to_unselected_page_does_not_pull_it_in() {
        let source = open_with_link();
        let mut output = reconstruct(&[PageSelection::new(&source, vec![0])]).unwrap();
        assert_eq!(output.page_count(), 1);

        let bytes = output.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("L-Page-1"));
        assert!(!text.contains("L-Page-2"));
        assert!(!text.contains("L-Page-3"));
        assert!(output.document().get_object(link_target(&output, 0)).is_err());
    }

    #[test]
    fn test_link_between_selected_pages_is_kept() {
        let source = open_with_link();
        let output = reconstruct(&[PageSelection::new(&source, vec![2, 0])]).unwrap();

        // Page 1 is now second and its link still lands on the copy of page 3
        assert_eq!(link_target(&output, 1), output.page_id(0).unwrap());
    }

    #[test]
    fn test_rotation_is_preserved() {
        let mut doc = Document::load_mem(&create_test_pdf(2, "R")).unwrap();
        let pages_id = doc
            .catalog()
            .unwrap()
            .get(b"Pages")
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_object_mut(pages_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Rotate", Object::Integer(180));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let source = DocumentHandle::open(&bytes).unwrap();
        let output = reconstruct(&[PageSelection::new(&source, vec![1])]).unwrap();
        assert_eq!(output.rotation(0).unwrap(), 180);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Property: output page k is source page manifest[k].source_index
        #[test]
        fn ordering_follows_manifest(
            pages in 1u32..7,
            moves in proptest::collection::vec((0usize..8, 0usize..8), 0..10),
            deletes in proptest::collection::vec(0usize..8, 0..3),
        ) {
            let source = open(pages, "P");
            let mut manifest = PageManifest::for_document(source.page_count());
            for (from, to) in moves {
                let len = manifest.len();
                manifest.move_entry(from % len, to % len).unwrap();
            }
            for index in deletes {
                if manifest.len() > 1 {
                    let len = manifest.len();
                    manifest.delete(index % len).unwrap();
                }
            }

            let order = manifest.source_order();
            let mut output = reconstruct(&[PageSelection::new(&source, order.clone())]).unwrap();
            let markers = page_markers(&output.to_bytes().unwrap());
            let expected: Vec<String> = order.iter().map(|i| format!("P-Page-{}", i + 1)).collect();
            prop_assert_eq!(markers, expected);
        }
    }
}
