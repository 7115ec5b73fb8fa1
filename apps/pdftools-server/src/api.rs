//! API handlers for the conversion server

use std::sync::Arc;

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use pdftools_core::conversion::{
    api_key_from_var, CloudConvertProvider, ConversionAdapter, ConversionPayload,
    ConversionRequest,
};
use pdftools_core::input::PDF_MIME;
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdftools-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /api/excel-to-pdf
///
/// Body `{ base64Data, fileName }`. Answers with the PDF as an attachment, or
/// `{ error }` with 400 for bad input and 500 for everything else.
pub async fn handle_excel_to_pdf(
    State(state): State<AppState>,
    payload: Result<Json<ConversionPayload>, axum::extract::rejection::JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let request = ConversionRequest::from_payload(payload)?;
    info!(
        "Conversion request: {} ({} bytes)",
        request.file_name,
        request.bytes.len()
    );

    let api_key = api_key_from_var(&state.api_key_env)?;
    let provider = CloudConvertProvider::new(state.config.clone(), api_key);
    let adapter = ConversionAdapter::new(Arc::new(provider), state.config.clone());
    let document = adapter.convert(&request).await?;

    Ok((
        [
            (CONTENT_TYPE, PDF_MIME.to_string()),
            (CONTENT_DISPOSITION, attachment_disposition(&document.file_name)),
        ],
        document.bytes,
    )
        .into_response())
}

/// `Content-Disposition` for a download named `file_name`. Control
/// characters are dropped and quotes and backslashes escaped, so any
/// caller-supplied name yields a valid header value.
fn attachment_disposition(file_name: &str) -> String {
    let mut quoted = String::with_capacity(file_name.len());
    for c in file_name.chars().filter(|c| !c.is_control()) {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    format!("attachment; filename=\"{}\"", quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_name_is_quoted() {
        assert_eq!(
            attachment_disposition("Sales.pdf"),
            "attachment; filename=\"Sales.pdf\""
        );
    }

    #[test]
    fn test_hostile_name_stays_one_header() {
        let value = attachment_disposition("a\"b\\c\r\nSet-Cookie: x\u{7f}.pdf");
        assert_eq!(
            value,
            "attachment; filename=\"a\\\"b\\\\cSet-Cookie: x.pdf\""
        );
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
