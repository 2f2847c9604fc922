//! Request and response bodies exchanged with the browser.

use serde::{Deserialize, Serialize};

/// Successful `/analyze` response.
///
/// The client keeps this and posts it back verbatim to `/download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Free-form plain text produced by the model.
    pub result: String,
    /// The uploaded photo as `data:<mime>;base64,<payload>`.
    pub image: String,
}

/// `/download` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub result: String,
    /// Data URI of the photo. Absent, `null` and `""` all omit the image section.
    #[serde(default)]
    pub image: Option<String>,
}

impl ReportRequest {
    /// The image data URI, if one was actually supplied.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.is_empty())
    }
}

impl From<AnalysisResult> for ReportRequest {
    fn from(a: AnalysisResult) -> Self {
        Self {
            result: a.result,
            image: Some(a.image),
        }
    }
}

/// `GET /analyze` liveness payload. The value is the string `"true"`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResponse {
    pub success: &'static str,
}

impl Default for ProbeResponse {
    fn default() -> Self {
        Self { success: "true" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_request_image_is_optional() {
        let r: ReportRequest = serde_json::from_str(r#"{"result":"Fern"}"#).unwrap();
        assert_eq!(r.image(), None);

        let r: ReportRequest = serde_json::from_str(r#"{"result":"Fern","image":null}"#).unwrap();
        assert_eq!(r.image(), None);

        let r: ReportRequest = serde_json::from_str(r#"{"result":"Fern","image":""}"#).unwrap();
        assert_eq!(r.image(), None);
    }

    #[test]
    fn analysis_result_feeds_report_request() {
        let a = AnalysisResult {
            result: "Monstera deliciosa".into(),
            image: "data:image/png;base64,AAAA".into(),
        };
        let json = serde_json::to_string(&a).unwrap();
        let r: ReportRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(r, ReportRequest::from(a));
        assert_eq!(r.image(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn probe_payload_is_string_true() {
        let v = serde_json::to_value(ProbeResponse::default()).unwrap();
        assert_eq!(v, serde_json::json!({ "success": "true" }));
    }
}
