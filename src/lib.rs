//! # attachment-preview
//!
//! Inline previews for email attachments: the first pages of every PDF as
//! small JPEG thumbnails, images passed through as they are.
//!
//! ## Pipeline Overview
//!
//! ```text
//! message
//!  │
//!  ├─ 1. List      attachments of the displayed message (AttachmentSource)
//!  ├─ 2. Classify  PDF / image / other, by declared MIME type
//!  ├─ 3. Notify    one placeholder per previewable attachment
//!  ├─ 4. Fetch     attachment bytes
//!  ├─ 5. Render    first N PDF pages via pdfium (spawn_blocking, concurrent)
//!  ├─ 6. Encode    fit into the thumbnail box → JPEG → data: URL
//!  └─ 7. Deliver   PreviewUnit per page/image, then one Completion notice
//! ```
//!
//! Everything the pipeline produces goes to a [`DisplaySurface`]. The
//! simplest one is a bounded channel, exposed as a `Stream`:
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use attachment_preview::{
//!     EmlDirectorySource, MessageId, PdfiumBackend, PreviewConfig, PreviewPipeline, SurfaceNotice,
//! };
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = PreviewPipeline::new(
//!         Arc::new(EmlDirectorySource::new("mail/")),
//!         Arc::new(PdfiumBackend::from_env()),
//!         PreviewConfig::default(),
//!     );
//!
//!     let (mut notices, run) = pipeline.preview_stream(MessageId::from("inbox/42.eml"));
//!     while let Some(notice) = notices.next().await {
//!         if let SurfaceNotice::Preview(unit) = notice {
//!             println!("{} page {:?}: {} bytes", unit.part_name, unit.page_number, unit.image.len());
//!         }
//!     }
//!     let report = run.await.unwrap();
//!     eprintln!("{} previews in {}ms", report.previews, report.duration_ms);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `attachpreview` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when embedding the library in a mail client:
//! ```toml
//! attachment-preview = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod launcher;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod source;
pub mod subscription;
pub mod surface;
pub mod viewer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BoxSize, CompletionMode, PreviewConfig, PreviewConfigBuilder};
pub use error::{PageError, PreviewError};
pub use launcher::{FileOpener, SystemOpener};
pub use output::{CompletionSignal, PreviewUnit, RunReport, SurfaceNotice};
pub use pipeline::classify::{classify, AttachmentKind};
pub use pipeline::render::{PageSize, PdfiumBackend, PreviewDocument, RenderBackend, PDFIUM_LIB_PATH_ENV};
pub use preview::PreviewPipeline;
pub use source::{AttachmentInfo, AttachmentSource, EmlDirectorySource, MessageId};
pub use subscription::{ClickCounter, ListenerRegistry, Subscription, ToolbarClick, WindowHook};
pub use surface::{channel_surface, ChannelSurface, Delivery, DisplaySurface, NoopSurface, NoticeStream};
pub use viewer::{FullView, FullViewRequest, WindowKind, WindowSpec};
