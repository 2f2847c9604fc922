//! Error type for the edgequake-plantdoc library and its HTTP mapping.
//!
//! A single enum, [`PlantDocError`], covers both pipelines. Each variant
//! belongs to one stage of the request:
//!
//! * **Upload**: [`PlantDocError::Validation`] (user forgot the file),
//!   [`PlantDocError::UploadTooLarge`] and [`PlantDocError::UploadFailed`]
//!   (disk trouble storing it).
//! * **Analysis**: [`PlantDocError::ExternalService`] for anything the
//!   model provider does wrong, [`PlantDocError::ProviderNotConfigured`] when
//!   no provider could be built at startup.
//! * **Report**: [`PlantDocError::InvalidReportRequest`],
//!   [`PlantDocError::Rendering`] and [`PlantDocError::Delivery`].
//!
//! The HTTP body shape differs per stage: the analyze endpoint answers
//! internal failures with `{"message": ...}` while everything else uses
//! `{"error": ...}`. Report failures are answered with a fixed message; the
//! detail goes to the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message returned when a multipart request carries no file part.
pub const MISSING_UPLOAD_MESSAGE: &str = "Please upload a file first.";

const RENDERING_FAILED_MESSAGE: &str = "An error occurred while generating the PDF report";
const DELIVERY_FAILED_MESSAGE: &str = "Error downloading the PDF report";

/// All errors returned by the edgequake-plantdoc library.
#[derive(Debug, Error)]
pub enum PlantDocError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The request is missing something the caller can fix (no file part,
    /// broken multipart framing).
    #[error("{0}")]
    Validation(String),

    /// The upload exceeded the configured body limit.
    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    /// The upload could not be written to or read back from transient storage.
    #[error("Failed to store uploaded image: {0}")]
    UploadFailed(String),

    // ── Analysis errors ───────────────────────────────────────────────────
    /// The model call failed: auth, quota, network, timeout, or a response
    /// without usable text.
    #[error("Plant analysis failed: {0}")]
    ExternalService(String),

    /// No model provider could be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The `/download` body could not be parsed.
    #[error("Invalid report request: {0}")]
    InvalidReportRequest(String),

    /// PDF assembly or image decoding failed.
    #[error("Report rendering failed: {0}")]
    Rendering(String),

    /// The finished report could not be streamed back.
    #[error("Report delivery failed: {0}")]
    Delivery(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlantDocError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            PlantDocError::Validation(_) | PlantDocError::InvalidReportRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            PlantDocError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlantDocError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            PlantDocError::Validation(msg) => json!({ "error": msg }),
            PlantDocError::InvalidReportRequest(_) | PlantDocError::UploadTooLarge(_) => {
                json!({ "error": self.to_string() })
            }
            PlantDocError::Rendering(detail) => {
                error!("Error generating PDF report: {}", detail);
                json!({ "error": RENDERING_FAILED_MESSAGE })
            }
            PlantDocError::Delivery(detail) => {
                error!("Error delivering PDF report: {}", detail);
                json!({ "error": DELIVERY_FAILED_MESSAGE })
            }
            PlantDocError::UploadFailed(_)
            | PlantDocError::ExternalService(_)
            | PlantDocError::ProviderNotConfigured { .. }
            | PlantDocError::InvalidConfig(_) => {
                error!("Analysis request failed: {}", self);
                json!({ "message": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: PlantDocError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn validation_maps_to_400_with_error_field() {
        let (status, body) =
            body_json(PlantDocError::Validation(MISSING_UPLOAD_MESSAGE.into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MISSING_UPLOAD_MESSAGE);
    }

    #[tokio::test]
    async fn external_service_uses_message_field() {
        let (status, body) =
            body_json(PlantDocError::ExternalService("quota exceeded".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let msg = body["message"].as_str().unwrap();
        assert!(msg.contains("quota exceeded"), "got: {msg}");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn rendering_hides_detail() {
        let (status, body) =
            body_json(PlantDocError::Rendering("bad huffman table".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], RENDERING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn delivery_hides_detail() {
        let (_, body) = body_json(PlantDocError::Delivery("broken pipe".into())).await;
        assert_eq!(body["error"], DELIVERY_FAILED_MESSAGE);
    }

    #[test]
    fn provider_not_configured_display() {
        let e = PlantDocError::ProviderNotConfigured {
            provider: "gemini".into(),
            hint: "Set GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("GEMINI_API_KEY"));
    }
}
