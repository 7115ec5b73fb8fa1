//! Single-call conversion services
//!
//! The service takes the file inline and answers with the result URL in the
//! same response, so the job comes back already finished.

use super::{check_response, ConversionJob, ConversionProvider, ConversionRequest};
use crate::error::{Result, ToolboxError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SyncResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct SyncProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SyncProvider {
    /// `endpoint` is the full conversion URL; the key goes in `x-api-key`
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ConversionProvider for SyncProvider {
    async fn submit(&self, request: &ConversionRequest) -> Result<ConversionJob> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&json!({
                "name": request.output_name(),
                "file": STANDARD.encode(&request.bytes),
                "async": false,
            }))
            .send()
            .await?;
        let body: SyncResponse = check_response("Conversion", response).await?.json().await?;

        if body.error {
            return Err(ToolboxError::ConversionFailed(
                body.message
                    .unwrap_or_else(|| "The service reported an error".into()),
            ));
        }
        let url = body.url.ok_or_else(|| {
            ToolboxError::UpstreamRequestFailed("Conversion response has no result URL".into())
        })?;
        Ok(ConversionJob::finished(request.file_name.clone(), url))
    }

    /// Jobs are finished on submit; polling just reports them back
    async fn poll(&self, job: &ConversionJob) -> Result<ConversionJob> {
        Ok(job.clone())
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let response = self.client.get(locator).send().await?;
        let bytes = check_response("Result download", response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionAdapter, ConversionConfig};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::Arc;

    async fn spawn_stub(reply_error: bool) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let files = format!("{}/files/result.pdf", base);
        let app = Router::new()
            .route(
                "/convert",
                post(move |Json(body): Json<Value>| async move {
                    if reply_error || body["file"].as_str().unwrap_or("").is_empty() {
                        Json(json!({ "error": true, "message": "Bad spreadsheet" }))
                    } else {
                        Json(json!({ "error": false, "url": files }))
                    }
                }),
            )
            .route("/files/result.pdf", get(|| async { b"%PDF-sync".to_vec() }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    #[tokio::test]
    async fn test_single_call_conversion() {
        let base = spawn_stub(false).await;
        let provider = Arc::new(SyncProvider::new(format!("{}/convert", base), "key"));
        let adapter = ConversionAdapter::new(provider, ConversionConfig::default());

        let document = adapter
            .convert(&ConversionRequest::new("q3.xlsx", b"data".to_vec()))
            .await
            .unwrap();

        assert_eq!(document.bytes, b"%PDF-sync".to_vec());
        assert_eq!(document.file_name, "q3.pdf");
    }

    #[tokio::test]
    async fn test_service_error_is_conversion_failed() {
        let base = spawn_stub(true).await;
        let provider = SyncProvider::new(format!("{}/convert", base), "key");
        let err = provider
            .submit(&ConversionRequest::new("q3.xlsx", b"data".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolboxError::ConversionFailed(ref m) if m == "Bad spreadsheet"));
    }
}
