//! Remote spreadsheet to PDF conversion
//!
//! A [`ConversionProvider`] talks to one remote service; the
//! [`ConversionAdapter`] drives it through submit, poll and fetch.

mod adapter;
mod cloudconvert;
mod endpoint;
mod provider;
mod sync_provider;

pub use adapter::{ConversionAdapter, ConversionState, ConvertedDocument};
pub use cloudconvert::CloudConvertProvider;
pub use endpoint::EndpointClient;
pub use provider::ConversionProvider;
pub use sync_provider::SyncProvider;

use crate::error::{Result, ToolboxError};
use crate::input::spreadsheet_format;
use crate::naming;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the conversion service key
pub const API_KEY_ENV: &str = "CLOUDCONVERT_API_KEY";

/// Reported when polling gives up
pub const TIMEOUT_MESSAGE: &str = "conversion time limit exceeded";

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    pub api_base: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub page_orientation: String,
    pub fit_to_page_width: bool,
    pub engine: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.cloudconvert.com/v2".into(),
            poll_interval: Duration::from_secs(1),
            max_attempts: 60,
            page_orientation: "landscape".into(),
            fit_to_page_width: true,
            engine: "office".into(),
        }
    }
}

/// Read the service key. Called per request so a changed key is picked up
/// without a restart.
pub fn api_key_from_env() -> Result<String> {
    api_key_from_var(API_KEY_ENV)
}

/// Read the service key from a named variable; missing or blank is
/// `ServiceMisconfigured`.
pub fn api_key_from_var(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ToolboxError::ServiceMisconfigured(format!(
            "{} is not set",
            var
        ))),
    }
}

/// JSON body of the conversion endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPayload {
    #[serde(default)]
    pub base64_data: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// A spreadsheet to convert
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ConversionRequest {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Decode an endpoint payload. Missing data is `MissingInput`, data that
    /// is not base64 is `UnsupportedFormat`.
    pub fn from_payload(payload: ConversionPayload) -> Result<Self> {
        let data = payload
            .base64_data
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ToolboxError::MissingInput("Missing file data".into()))?;
        let bytes = STANDARD.decode(data.trim()).map_err(|e| {
            ToolboxError::UnsupportedFormat(format!("File data is not valid base64: {}", e))
        })?;
        let file_name = payload
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "spreadsheet.xlsx".to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn to_payload(&self) -> ConversionPayload {
        ConversionPayload {
            base64_data: Some(STANDARD.encode(&self.bytes)),
            file_name: Some(self.file_name.clone()),
        }
    }

    /// Input format declared to the service
    pub fn input_format(&self) -> &'static str {
        spreadsheet_format(&self.file_name)
    }

    /// Name of the converted file
    pub fn output_name(&self) -> String {
        naming::spreadsheet_pdf(&self.file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Finished,
    Error,
}

impl JobStatus {
    /// Anything that is neither `finished` nor `error` is still pending
    pub fn from_provider(status: &str) -> Self {
        match status {
            "finished" => JobStatus::Finished,
            "error" => JobStatus::Error,
            _ => JobStatus::Pending,
        }
    }
}

/// A remote conversion job as last observed
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub id: String,
    pub status: JobStatus,
    /// Set once the job has finished
    pub result_locator: Option<String>,
    /// Provider's explanation when the job failed
    pub message: Option<String>,
}

impl ConversionJob {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            result_locator: None,
            message: None,
        }
    }

    pub fn finished(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Finished,
            result_locator: Some(locator.into()),
            message: None,
        }
    }
}

/// Turn a non-success response into `UpstreamRequestFailed`
pub(crate) async fn check_response(
    step: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ToolboxError::UpstreamRequestFailed(format!(
        "{} returned {}: {}",
        step,
        status,
        body.trim()
    )))
}
