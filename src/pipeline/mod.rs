//! Pipeline stages for the two request flows.
//!
//! Each submodule implements one step, testable on its own. The HTTP
//! handlers in [`crate::server`] only chain them together.
//!
//! ## Data Flow
//!
//! ```text
//! /analyze:   upload ──▶ encode ──▶ llm
//!             (multipart) (base64)   (VLM)
//!
//! /download:  encode ──▶ layout ──▶ report
//!             (data URI)  (wrap/paginate) (lopdf)
//! ```
//!
//! 1. [`upload`] streams the first file part into a transient file
//! 2. [`encode`] base64-wraps the photo and builds its data URI, and decodes
//!    it again for the report
//! 3. [`llm`] makes the single vision-model call; the only stage with network I/O
//! 4. [`layout`] wraps text in Helvetica metrics and flows it over pages
//! 5. [`report`] assembles the PDF in `spawn_blocking` and stores it until
//!    delivery

pub mod encode;
pub mod layout;
pub mod llm;
pub mod report;
pub mod upload;
