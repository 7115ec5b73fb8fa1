use super::{ConversionJob, ConversionRequest};
use crate::error::Result;
use async_trait::async_trait;

/// One remote conversion service.
///
/// Job-based services return a pending job from `submit` and advance it
/// through `poll`. Synchronous services return a finished job straight away
/// and are never polled.
#[async_trait]
pub trait ConversionProvider: Send + Sync {
    /// Upload the file and start the conversion
    async fn submit(&self, request: &ConversionRequest) -> Result<ConversionJob>;

    /// Current state of a submitted job
    async fn poll(&self, job: &ConversionJob) -> Result<ConversionJob>;

    /// Download the converted file
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}
