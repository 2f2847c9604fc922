//! Stream a rendered report to the client as an attachment.
//!
//! The report's [`TransientFile`](crate::transient::TransientFile) guard
//! moves into the body stream. The file is therefore unlinked when the body
//! is dropped: after the last chunk is sent, or when the client goes away
//! mid-transfer.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use crate::error::PlantDocError;
use crate::pipeline::report::ReportDocument;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// `Content-Disposition` value for a download named `filename`.
pub fn attachment(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// Build the streaming response for `report`.
pub async fn deliver(report: ReportDocument) -> Result<Response, PlantDocError> {
    let file = tokio::fs::File::open(report.path()).await.map_err(|e| {
        PlantDocError::Delivery(format!("opening {}: {e}", report.path().display()))
    })?;

    let disposition = attachment(&report.download_name);
    let size = report.size;
    let guard = report.into_file();

    let stream = ReaderStream::new(file).map(move |chunk| {
        let _held = &guard;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PDF_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| PlantDocError::Delivery(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_quotes_filename() {
        assert_eq!(
            attachment("plant_analysis_report_1760700000000.pdf"),
            "attachment; filename=\"plant_analysis_report_1760700000000.pdf\""
        );
        assert_eq!(attachment("a\"b.pdf"), "attachment; filename=\"a_b.pdf\"");
    }
}
