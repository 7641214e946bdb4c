//! Error types for the attachment-preview library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`PreviewError`]: one **operation** failed (listing a message's
//!   attachments, fetching one attachment, opening one document, resolving a
//!   full-view request). The preview pipeline catches these per attachment,
//!   logs them and moves on to the next attachment; only the direct entry
//!   points ([`crate::PreviewPipeline::open_full_view`], the backends
//!   themselves) hand them to the caller.
//!
//! * [`PageError`]: **one page** of an otherwise healthy document failed to
//!   rasterise or encode. Sibling pages are unaffected; the failure is counted
//!   in [`crate::RunReport::failed_pages`].
//!
//! Nothing in the pipeline escalates either kind to a run-level failure: a run
//! always reaches its completion step.

use thiserror::Error;

/// Failure of a single pipeline operation.
#[derive(Debug, Error)]
pub enum PreviewError {
    // ── Attachment source errors ──────────────────────────────────────────
    /// The message is gone, unreadable, or not a parseable message.
    #[error("Cannot list attachments of message '{message_id}': {detail}")]
    AttachmentList { message_id: String, detail: String },

    /// The attachment bytes could not be materialised.
    #[error("Cannot fetch attachment '{part_name}' of message '{message_id}': {detail}")]
    AttachmentFetch {
        message_id: String,
        part_name: String,
        detail: String,
    },

    /// No attachment with this part name exists in the message.
    #[error("Message '{message_id}' has no attachment '{part_name}'")]
    UnknownAttachment {
        message_id: String,
        part_name: String,
    },

    /// The message identifier cannot be mapped onto the store.
    #[error("Invalid message id '{0}'")]
    InvalidMessageId(String),

    // ── Render backend errors ─────────────────────────────────────────────
    /// The bytes are not a PDF the backend can open, or the renderer faulted.
    #[error("Render backend failed on '{part_name}': {detail}")]
    RenderBackend { part_name: String, detail: String },

    /// Thumbnail generation for one attachment exceeded the configured bound.
    #[error("Rendering '{part_name}' timed out after {secs}s")]
    RenderTimeout { part_name: String, secs: u64 },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
to load a specific copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Full view errors ──────────────────────────────────────────────────
    /// A full-view query string is missing a field or has a bad page number.
    #[error("Invalid full-view request '{query}': {reason}")]
    InvalidFullView { query: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, runtime failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page of a PDF attachment.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page lookup or rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: u32, detail: String },

    /// The rasterised page could not be encoded as JPEG.
    #[error("Page {page}: encoding failed: {detail}")]
    EncodeFailed { page: u32, detail: String },
}

impl PageError {
    /// 1-based page number the error belongs to.
    pub fn page(&self) -> u32 {
        match self {
            PageError::RenderFailed { page, .. } | PageError::EncodeFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let e = PreviewError::AttachmentFetch {
            message_id: "inbox/42.eml".into(),
            part_name: "2".into(),
            detail: "gone".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("inbox/42.eml"), "got: {msg}");
        assert!(msg.contains("'2'"), "got: {msg}");
    }

    #[test]
    fn timeout_display() {
        let e = PreviewError::RenderTimeout {
            part_name: "1".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::EncodeFailed {
            page: 3,
            detail: "boom".into(),
        };
        assert_eq!(e.page(), 3);
        assert!(e.to_string().starts_with("Page 3"));
    }
}
