//! Attachment classification by declared MIME type.

use serde::{Deserialize, Serialize};

/// What the pipeline does with an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    /// Rendered page by page into thumbnails.
    Pdf,
    /// Passed through as-is.
    Image,
    /// Ignored: no placeholder, no fetch.
    Other,
}

impl AttachmentKind {
    pub fn is_previewable(self) -> bool {
        !matches!(self, AttachmentKind::Other)
    }
}

/// Classify a content type with a case-insensitive prefix match.
///
/// Parameters are part of the prefix match, so `application/pdf; name=a.pdf`
/// is still a PDF.
pub fn classify(content_type: &str) -> AttachmentKind {
    let ct = content_type.trim_start().to_ascii_lowercase();
    if ct.starts_with("application/pdf") {
        AttachmentKind::Pdf
    } else if ct.starts_with("image/") {
        AttachmentKind::Image
    } else {
        AttachmentKind::Other
    }
}
