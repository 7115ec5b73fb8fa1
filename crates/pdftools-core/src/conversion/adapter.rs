//! Submit, poll, fetch
//!
//! State machine: `Idle -> Uploading -> Converting{attempt} -> Done`, with
//! `Failed` reachable from every step and `TimedOut` once the poll budget is
//! spent. The interval is slept before each poll, and a terminal status stops
//! polling immediately.

use super::{ConversionConfig, ConversionJob, ConversionProvider, ConversionRequest, JobStatus};
use super::TIMEOUT_MESSAGE;
use crate::error::{Result, ToolboxError};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Uploading,
    Converting { attempt: u32 },
    Done,
    Failed(String),
    TimedOut,
}

/// The converted PDF and the name it should be delivered under
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

pub struct ConversionAdapter {
    provider: Arc<dyn ConversionProvider>,
    config: ConversionConfig,
}

impl ConversionAdapter {
    pub fn new(provider: Arc<dyn ConversionProvider>, config: ConversionConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConvertedDocument> {
        self.convert_observed(request, |_| {}).await
    }

    /// Convert, reporting every state transition to `observe`
    pub async fn convert_observed(
        &self,
        request: &ConversionRequest,
        mut observe: impl FnMut(&ConversionState) + Send,
    ) -> Result<ConvertedDocument> {
        observe(&ConversionState::Idle);
        let result = self.run(request, &mut observe).await;
        match &result {
            Ok(document) => {
                info!(
                    "Converted {} to {} ({} bytes)",
                    request.file_name,
                    document.file_name,
                    document.bytes.len()
                );
                observe(&ConversionState::Done);
            }
            Err(ToolboxError::ConversionTimedOut(_)) => {
                warn!("Conversion of {} timed out", request.file_name);
                observe(&ConversionState::TimedOut);
            }
            Err(e) => {
                warn!("Conversion of {} failed: {}", request.file_name, e);
                observe(&ConversionState::Failed(e.to_string()));
            }
        }
        result
    }

    async fn run(
        &self,
        request: &ConversionRequest,
        observe: &mut (impl FnMut(&ConversionState) + Send),
    ) -> Result<ConvertedDocument> {
        if request.bytes.is_empty() {
            return Err(ToolboxError::MissingInput("The file is empty".into()));
        }

        observe(&ConversionState::Uploading);
        let job = self.provider.submit(request).await?;
        debug!("Submitted conversion job {}", job.id);

        let job = self.wait_for(job, observe).await?;
        let locator = job.result_locator.ok_or_else(|| {
            ToolboxError::ConversionFailed(format!("Job {} finished without a result file", job.id))
        })?;

        let bytes = self.provider.fetch(&locator).await?;
        Ok(ConvertedDocument {
            bytes,
            file_name: request.output_name(),
        })
    }

    async fn wait_for(
        &self,
        mut job: ConversionJob,
        observe: &mut (impl FnMut(&ConversionState) + Send),
    ) -> Result<ConversionJob> {
        let mut attempt = 0;
        loop {
            match job.status {
                JobStatus::Finished => return Ok(job),
                JobStatus::Error => {
                    return Err(ToolboxError::ConversionFailed(
                        job.message
                            .unwrap_or_else(|| format!("Job {} reported an error", job.id)),
                    ))
                }
                JobStatus::Pending => {}
            }

            if attempt >= self.config.max_attempts {
                return Err(ToolboxError::ConversionTimedOut(TIMEOUT_MESSAGE.into()));
            }
            attempt += 1;
            observe(&ConversionState::Converting { attempt });

            tokio::time::sleep(self.config.poll_interval).await;
            job = self.provider.poll(&job).await?;
            debug!("Poll {} of job {}: {:?}", attempt, job.id, job.status);
        }
    }
}
