//! Split
//!
//! One single-page document per source page.

use crate::document::DocumentHandle;
use crate::error::{Result, ToolboxError};
use crate::naming;
use crate::reconstruct::{reconstruct, PageSelection};
use crate::sink::{deliver_paced, Deliverable, TransferSink};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    /// Pause between successive transfers
    pub pause: Duration,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(100),
        }
    }
}

/// Build `page-1.pdf` .. `page-N.pdf`
pub fn split_pages(source: &DocumentHandle) -> Result<Vec<Deliverable>> {
    if source.page_count() == 0 {
        return Err(ToolboxError::MissingInput("The document has no pages".into()));
    }
    let mut outputs = Vec::with_capacity(source.page_count());
    for index in 0..source.page_count() {
        let mut single = reconstruct(&[PageSelection::new(source, vec![index])])?;
        debug!("Extracted page {}", index + 1);
        outputs.push(Deliverable::pdf(
            single.to_bytes()?,
            naming::split_page(index + 1),
        ));
    }
    Ok(outputs)
}

/// Split and hand every page to the sink, pausing between transfers
pub async fn split_and_deliver(
    source: &DocumentHandle,
    sink: &mut dyn TransferSink,
    options: SplitOptions,
) -> Result<usize> {
    let outputs = split_pages(source)?;
    deliver_paced(sink, &outputs, options.pause).await?;
    info!("Split document into {} files", outputs.len());
    Ok(outputs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::testing::{create_test_pdf, page_markers};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_three_pages() {
        let source = DocumentHandle::open(&create_test_pdf(3, "S")).unwrap();
        let outputs = split_pages(&source).unwrap();

        assert_eq!(outputs.len(), 3);
        let names: Vec<_> = outputs.iter().map(|o| o.filename.as_str()).collect();
        assert_eq!(names, vec!["page-1.pdf", "page-2.pdf", "page-3.pdf"]);
        for (i, output) in outputs.iter().enumerate() {
            assert_eq!(page_markers(&output.bytes), vec![format!("S-Page-{}", i + 1)]);
        }
    }

    #[test]
    fn test_split_empty_document_fails() {
        let mut empty = DocumentHandle::empty();
        let source = DocumentHandle::open(&empty.to_bytes().unwrap()).unwrap();
        assert!(matches!(
            split_pages(&source),
            Err(ToolboxError::MissingInput(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_and_deliver_in_order() {
        let source = DocumentHandle::open(&create_test_pdf(3, "S")).unwrap();
        let mut sink = MemorySink::new();
        let count = split_and_deliver(&source, &mut sink, SplitOptions::default())
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            sink.filenames(),
            vec!["page-1.pdf", "page-2.pdf", "page-3.pdf"]
        );
    }
}
