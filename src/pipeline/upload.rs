//! Upload receiver: multipart form → transient file on disk.
//!
//! The first part that carries a non-empty filename is the photo; plain text
//! fields and empty file inputs are skipped. The photo is streamed chunk by chunk into a
//! [`TransientFile`] so a large upload never sits fully in memory before it
//! is needed, and so the file is unlinked however the request ends.

use std::path::Path;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{PlantDocError, MISSING_UPLOAD_MESSAGE};
use crate::pipeline::encode::{encode_image, sniff_mime, EncodedImage, OCTET_STREAM};
use crate::transient::{TransientFile, UPLOAD_PREFIX};

/// Bytes kept from the start of the upload for MIME sniffing.
const SNIFF_LEN: usize = 32;

/// A photo stored for the duration of one `/analyze` request.
#[derive(Debug)]
pub struct UploadedImage {
    file: TransientFile,
    pub original_filename: String,
    pub mime_type: String,
    pub size: u64,
}

impl UploadedImage {
    /// Where the photo is stored.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the stored photo back and base64-encode it.
    pub async fn read_encoded(&self) -> Result<EncodedImage, PlantDocError> {
        let bytes = tokio::fs::read(self.path()).await.map_err(|e| {
            PlantDocError::UploadFailed(format!("reading {}: {e}", self.path().display()))
        })?;
        Ok(encode_image(&bytes, self.mime_type.clone()))
    }

    /// Delete the stored photo now. Dropping the value does the same silently.
    pub fn discard(self) -> std::io::Result<()> {
        self.file.remove()
    }
}

/// Pick the first file part out of `multipart` and store it in `upload_dir`.
///
/// # Errors
/// * [`PlantDocError::Validation`] when the form holds no file part or its
///   framing is broken.
/// * [`PlantDocError::UploadTooLarge`] when the body limit is hit mid-stream.
/// * [`PlantDocError::UploadFailed`] when the file cannot be written.
pub async fn receive_upload(
    multipart: &mut Multipart,
    upload_dir: &Path,
) -> Result<UploadedImage, PlantDocError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        // An empty filename is what a browser sends for an unfilled file input.
        let Some(original_filename) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            debug!("Skipping form field {:?} without a file", field.name());
            continue;
        };
        let declared_mime = field.content_type().map(str::to_string);

        let (file, guard) = TransientFile::create_in(upload_dir, UPLOAD_PREFIX, "", "upload")
            .map_err(|e| {
                PlantDocError::UploadFailed(format!(
                    "creating file in {}: {e}",
                    upload_dir.display()
                ))
            })?;
        let mut out = tokio::fs::File::from_std(file);

        let mut size = 0u64;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if head.len() < SNIFF_LEN {
                let take = (SNIFF_LEN - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            out.write_all(&chunk)
                .await
                .map_err(|e| PlantDocError::UploadFailed(e.to_string()))?;
            size += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|e| PlantDocError::UploadFailed(e.to_string()))?;

        let mime_type = resolve_mime(declared_mime.as_deref(), &head);
        info!(
            "Stored upload '{}' ({}, {} bytes) at {}",
            original_filename,
            mime_type,
            size,
            guard.path().display()
        );

        return Ok(UploadedImage {
            file: guard,
            original_filename,
            mime_type,
            size,
        });
    }

    Err(PlantDocError::Validation(MISSING_UPLOAD_MESSAGE.to_string()))
}

/// Declared type wins unless it is missing or the generic octet-stream.
fn resolve_mime(declared: Option<&str>, head: &[u8]) -> String {
    match declared {
        Some(m) if !m.is_empty() && m != OCTET_STREAM => m.to_string(),
        _ => sniff_mime(head).unwrap_or(OCTET_STREAM).to_string(),
    }
}

fn multipart_error(e: MultipartError) -> PlantDocError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PlantDocError::UploadTooLarge(e.body_text())
    } else {
        PlantDocError::Validation(format!("Failed to parse multipart data: {}", e.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};

    const BOUNDARY: &str = "plantdoc-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, Option<&'a str>, &'a [u8]),
    }

    async fn multipart(parts: &[Part<'_>]) -> Multipart {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, filename, mime, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                        )
                        .as_bytes(),
                    );
                    if let Some(mime) = mime {
                        body.extend_from_slice(format!("Content-Type: {mime}\r\n").as_bytes());
                    }
                    body.extend_from_slice(b"\r\n");
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[tokio::test]
    async fn stores_first_file_part() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[
            Part::Text("note", "my fern"),
            Part::File("photo", "fern.jpg", Some("image/jpeg"), b"first"),
            Part::File("other", "rose.jpg", Some("image/jpeg"), b"second"),
        ])
        .await;

        let upload = receive_upload(&mut mp, dir.path()).await.unwrap();
        assert_eq!(upload.original_filename, "fern.jpg");
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.size, 5);
        assert_eq!(std::fs::read(upload.path()).unwrap(), b"first");

        let encoded = upload.read_encoded().await.unwrap();
        assert_eq!(encoded.data_uri(), "data:image/jpeg;base64,Zmlyc3Q=");
    }

    #[tokio::test]
    async fn missing_content_type_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::File("file", "leaf", None, PNG_MAGIC)]).await;
        let upload = receive_upload(&mut mp, dir.path()).await.unwrap();
        assert_eq!(upload.mime_type, "image/png");
    }

    #[tokio::test]
    async fn unknown_content_falls_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::File(
            "file",
            "leaf.bin",
            Some(OCTET_STREAM),
            b"not an image",
        )])
        .await;
        let upload = receive_upload(&mut mp, dir.path()).await.unwrap();
        assert_eq!(upload.mime_type, OCTET_STREAM);
    }

    #[tokio::test]
    async fn no_file_part_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::Text("note", "forgot the photo")]).await;
        let err = receive_upload(&mut mp, dir.path()).await.unwrap_err();
        match err {
            PlantDocError::Validation(msg) => assert_eq!(msg, MISSING_UPLOAD_MESSAGE),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_filename_part_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::File("image", "", Some(OCTET_STREAM), b"")]).await;
        let err = receive_upload(&mut mp, dir.path()).await.unwrap_err();
        match err {
            PlantDocError::Validation(msg) => assert_eq!(msg, MISSING_UPLOAD_MESSAGE),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_filename_part_before_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[
            Part::File("blank", "", Some(OCTET_STREAM), b""),
            Part::File("image", "leaf.png", Some("image/png"), PNG_MAGIC),
        ])
        .await;
        let upload = receive_upload(&mut mp, dir.path()).await.unwrap();
        assert_eq!(upload.original_filename, "leaf.png");
        assert_eq!(upload.mime_type, "image/png");
    }

    #[tokio::test]
    async fn dropping_upload_unlinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::File("file", "a.png", Some("image/png"), PNG_MAGIC)]).await;
        let upload = receive_upload(&mut mp, dir.path()).await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn discard_unlinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart(&[Part::File("file", "a.png", Some("image/png"), PNG_MAGIC)]).await;
        let upload = receive_upload(&mut mp, dir.path()).await.unwrap();
        let path = upload.path().to_path_buf();
        upload.discard().unwrap();
        assert!(!path.exists());
    }
}
