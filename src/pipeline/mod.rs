//! Pipeline stages for attachment previews.
//!
//! Each submodule implements one transformation step. The render backend is a
//! trait, so classification and encoding never see pdfium.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ render ──▶ thumbnail ──▶ encode
//! (MIME type)  (pdfium)   (fit to box)  (JPEG data URL)
//! ```
//!
//! 1. [`classify`]: PDF / image / other, from the declared content type
//! 2. [`render`]: open a document, measure and rasterise pages
//! 3. [`thumbnail`]: fit a page into the thumbnail box, render it
//! 4. [`encode`]: JPEG-encode the bitmap, wrap bytes in `data:` URLs
//!
//! The orchestration (placeholders, fan-out, completion) lives in
//! [`crate::preview`].

pub mod classify;
pub mod encode;
pub mod render;
pub mod thumbnail;
