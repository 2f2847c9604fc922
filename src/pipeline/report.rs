//! Report rendering: analysis text + photo → PDF file in transient storage.
//!
//! ## Why spawn_blocking?
//!
//! Decoding a multi-megapixel JPEG and deflating its pixels into the PDF is
//! CPU-bound. Running it on the blocking pool keeps the Tokio workers free
//! for other requests while a report is being built.
//!
//! The finished bytes are written to a [`TransientFile`] and flushed before
//! the report is handed to delivery, so the download never sees a partial
//! file.

use chrono::{Local, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::PlantDocError;
use crate::output::ReportRequest;
use crate::pipeline::encode::decode_data_uri;
use crate::pipeline::layout::{fit, Align, PageLayout, FONT_NAME, PAGE_HEIGHT, PAGE_WIDTH};
use crate::transient::{TransientDirs, TransientFile, REPORT_PREFIX, REPORT_SUFFIX};

pub const REPORT_TITLE: &str = "Plant Analysis Report";

const TITLE_SIZE: f32 = 24.0;
const DATE_SIZE: f32 = 24.0;
const BODY_SIZE: f32 = 14.0;
/// Bounding box the photo is fitted into.
const IMAGE_BOX: (f32, f32) = (500.0, 300.0);
const IMAGE_NAME: &str = "Im1";

/// A decoded photo ready to embed: 8-bit RGB, row-major.
#[derive(Debug, Clone)]
pub struct ReportImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// A rendered report waiting to be delivered.
#[derive(Debug)]
pub struct ReportDocument {
    file: TransientFile,
    /// Filename offered to the browser.
    pub download_name: String,
    pub size: u64,
}

impl ReportDocument {
    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    /// Hand over the guard; the file lives as long as the returned value.
    pub fn into_file(self) -> TransientFile {
        self.file
    }
}

/// Decode a photo data URI (PNG or JPEG) for embedding.
pub fn decode_report_image(uri: &str) -> Result<ReportImage, PlantDocError> {
    let bytes = decode_data_uri(uri)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| PlantDocError::Rendering(format!("cannot decode image: {e}")))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    debug!("Decoded report image {}x{}", width, height);
    Ok(ReportImage {
        width,
        height,
        rgb: rgb.into_raw(),
    })
}

/// Today's date the way the report prints it, e.g. `10/17/2026`.
pub fn report_date() -> String {
    Local::now().format("%-m/%-d/%Y").to_string()
}

/// Lay out and serialise the report.
///
/// Top to bottom: centred title, date, body text, then the photo fitted
/// into a 500×300 pt box when one is given.
pub fn build_report_pdf(
    body: &str,
    date: &str,
    image: Option<ReportImage>,
) -> Result<Vec<u8>, PlantDocError> {
    let mut layout = PageLayout::new();
    layout.text(REPORT_TITLE, TITLE_SIZE, Align::Center);
    layout.move_down(TITLE_SIZE);
    layout.text(&format!("Date: {date}"), DATE_SIZE, Align::Left);
    layout.move_down(DATE_SIZE);
    layout.text(body, BODY_SIZE, Align::Left);

    if let Some(ref img) = image {
        let (w, h) = fit(img.width, img.height, IMAGE_BOX.0, IMAGE_BOX.1);
        if w > 0.0 && h > 0.0 {
            layout.move_down(BODY_SIZE);
            layout.image(IMAGE_NAME, w, h);
        }
    }

    assemble(layout.into_pages(), image)
}

fn assemble(
    pages: Vec<Vec<Operation>>,
    image: Option<ReportImage>,
) -> Result<Vec<u8>, PlantDocError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! { FONT_NAME => font_id },
    };
    if let Some(img) = image {
        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(img.width),
                "Height" => i64::from(img.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
            },
            img.rgb,
        );
        let image_id = doc.add_object(image_stream);
        resources.set("XObject", dictionary! { IMAGE_NAME => image_id });
    }
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| PlantDocError::Rendering(format!("content stream: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (PAGE_WIDTH as i64).into(),
                (PAGE_HEIGHT as i64).into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| PlantDocError::Rendering(format!("serialising PDF: {e}")))?;
    Ok(buf)
}

/// Render `request` into a new transient PDF under the reports directory.
pub async fn render_report(
    request: &ReportRequest,
    dirs: &TransientDirs,
) -> Result<ReportDocument, PlantDocError> {
    dirs.ensure_reports().await.map_err(|e| {
        PlantDocError::Rendering(format!("creating {}: {e}", dirs.reports.display()))
    })?;

    let body = request.result.clone();
    let image_uri = request.image().map(str::to_string);
    let date = report_date();

    let pdf = tokio::task::spawn_blocking(move || {
        let image = image_uri.as_deref().map(decode_report_image).transpose()?;
        build_report_pdf(&body, &date, image)
    })
    .await
    .map_err(|e| PlantDocError::Rendering(format!("render task panicked: {e}")))??;

    let (file, guard) =
        TransientFile::create_in(&dirs.reports, REPORT_PREFIX, REPORT_SUFFIX, "report")
            .map_err(|e| PlantDocError::Rendering(format!("creating report file: {e}")))?;
    let mut out = tokio::fs::File::from_std(file);
    out.write_all(&pdf)
        .await
        .map_err(|e| PlantDocError::Rendering(format!("writing report: {e}")))?;
    out.flush()
        .await
        .map_err(|e| PlantDocError::Rendering(format!("writing report: {e}")))?;

    let download_name = format!(
        "{}{}{}",
        REPORT_PREFIX,
        Utc::now().timestamp_millis(),
        REPORT_SUFFIX
    );
    info!(
        "Rendered report {} ({} bytes, image: {})",
        guard.path().display(),
        pdf.len(),
        request.image().is_some()
    );

    Ok(ReportDocument {
        file: guard,
        download_name,
        size: pdf.len() as u64,
    })
}
