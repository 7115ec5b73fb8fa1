//! Client side of the conversion endpoint
//!
//! Validates the spreadsheet locally, posts it as base64 JSON and reads back
//! either the PDF or a JSON `{ error }` body.

use super::{ConversionRequest, ConvertedDocument};
use crate::error::{Result, ToolboxError};
use crate::input::InputFile;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct EndpointClient {
    client: reqwest::Client,
    url: String,
}

impl EndpointClient {
    /// `url` is the full endpoint, e.g. `http://localhost:3000/api/excel-to-pdf`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub async fn convert(&self, file: &InputFile) -> Result<ConvertedDocument> {
        file.require_spreadsheet()?;
        if file.bytes.is_empty() {
            return Err(ToolboxError::MissingInput(format!("{} is empty", file.name)));
        }

        let request = ConversionRequest::new(file.name.clone(), file.bytes.clone());
        let response = self
            .client
            .post(&self.url)
            .json(&request.to_payload())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("Endpoint returned {}", status));
            return Err(ToolboxError::UpstreamRequestFailed(message));
        }

        let is_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/pdf"));
        if !is_pdf {
            return Err(ToolboxError::UpstreamRequestFailed(
                "Endpoint did not return a PDF".into(),
            ));
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| request.output_name());
        let bytes = response.bytes().await?.to_vec();

        info!("Received {} ({} bytes)", file_name, bytes.len());
        Ok(ConvertedDocument { bytes, file_name })
    }
}

/// `filename` parameter of a Content-Disposition value
pub(crate) fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"report.pdf\""),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            disposition_filename("attachment;filename=plain.pdf"),
            Some("plain.pdf".to_string())
        );
        assert_eq!(disposition_filename("inline"), None);
    }

    #[tokio::test]
    async fn test_non_spreadsheet_rejected_before_request() {
        // Unroutable URL: the call must fail before any I/O
        let client = EndpointClient::new("http://127.0.0.1:9/api/excel-to-pdf");
        let err = client
            .convert(&InputFile::new("notes.txt", Some("text/plain"), b"hi".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolboxError::UnsupportedFormat(_)));
    }
}
