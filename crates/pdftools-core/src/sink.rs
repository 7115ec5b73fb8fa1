//! Transfer sink: the boundary where finished bytes leave the library

use crate::error::Result;
use crate::input::PDF_MIME;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Finished output ready to hand to a sink
#[derive(Debug, Clone, PartialEq)]
pub struct Deliverable {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

impl Deliverable {
    pub fn pdf(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime: PDF_MIME.to_string(),
        }
    }
}

/// Turns bytes into a delivered file. One implementation per platform.
pub trait TransferSink: Send {
    fn deliver(&mut self, bytes: &[u8], filename: &str, mime: &str) -> Result<()>;
}

/// Deliver one output
pub fn deliver(sink: &mut dyn TransferSink, deliverable: &Deliverable) -> Result<()> {
    sink.deliver(
        &deliverable.bytes,
        &deliverable.filename,
        &deliverable.mime,
    )
}

/// Deliver outputs strictly in order, pausing between successive transfers.
/// There is no pause after the last one.
pub async fn deliver_paced(
    sink: &mut dyn TransferSink,
    deliverables: &[Deliverable],
    pause: Duration,
) -> Result<()> {
    for (i, deliverable) in deliverables.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        deliver(sink, deliverable)?;
    }
    Ok(())
}

/// Writes each delivery to `<dir>/<filename>`
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TransferSink for DirectorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str, mime: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        info!("Wrote {} ({}, {} bytes)", path.display(), mime, bytes.len());
        Ok(())
    }
}

/// Keeps deliveries in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub delivered: Vec<Deliverable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.delivered.iter().map(|d| d.filename.as_str()).collect()
    }
}

impl TransferSink for MemorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str, mime: &str) -> Result<()> {
        debug!("Captured {} ({} bytes)", filename, bytes.len());
        self.delivered.push(Deliverable {
            bytes: bytes.to_vec(),
            filename: filename.to_string(),
            mime: mime.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    fn outputs(n: usize) -> Vec<Deliverable> {
        (1..=n)
            .map(|i| Deliverable::pdf(vec![i as u8], format!("page-{}.pdf", i)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_delivery_keeps_order() {
        let mut sink = MemorySink::new();
        deliver_paced(&mut sink, &outputs(3), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(
            sink.filenames(),
            vec!["page-1.pdf", "page-2.pdf", "page-3.pdf"]
        );
        assert_eq!(sink.delivered[2].mime, "application/pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_only_between_transfers() {
        let mut sink = MemorySink::new();
        let start = Instant::now();
        deliver_paced(&mut sink, &outputs(3), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("pdftools-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&dir);
        sink.deliver(b"%PDF-1.7", "out.pdf", PDF_MIME).unwrap();
        assert_eq!(std::fs::read(dir.join("out.pdf")).unwrap(), b"%PDF-1.7");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
