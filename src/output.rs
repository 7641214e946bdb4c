//! Values the pipeline hands to a display surface, and the per-run report.
//!
//! Every notice is self-contained and serialisable so a surface living in a
//! different process (a message pane script, a websocket client) can receive
//! it as JSON without further lookups.

use serde::{Deserialize, Serialize};

/// One rendered PDF page or one passed-through image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewUnit {
    /// Message the attachment belongs to.
    pub message_id: String,
    /// Attachment identity within the message.
    pub part_name: String,
    /// 1-based page number for PDFs; `None` for images.
    pub page_number: Option<u32>,
    /// `data:` URL of the thumbnail (JPEG) or of the raw image.
    pub image: String,
    /// Always `false`: batch completion travels as a separate notice.
    pub is_last_of_batch: bool,
    /// Number of units the same PDF attachment will produce, `None` for images.
    pub total_expected: Option<u32>,
}

/// Completion notice: no further attachments will be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSignal {
    /// Preview units delivered before this notice.
    pub previews_delivered: usize,
    /// `true` when every render task had already finished.
    pub renders_settled: bool,
}

/// Everything a display surface can be told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceNotice {
    /// Show a generic loading indicator.
    Placeholder,
    /// A preview is ready.
    Preview(PreviewUnit),
    /// The run is over (see [`crate::CompletionMode`] for what "over" means).
    Completion(CompletionSignal),
}

impl SurfaceNotice {
    pub fn as_preview(&self) -> Option<&PreviewUnit> {
        match self {
            SurfaceNotice::Preview(unit) => Some(unit),
            _ => None,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Attachments listed for the message, of any type.
    pub attachments: usize,
    /// Placeholder notices sent (one per PDF or image attachment).
    pub placeholders: usize,
    /// Preview units delivered to the surface.
    pub previews: usize,
    /// PDF or image attachments that produced no preview at all.
    pub failed_attachments: usize,
    /// Individual PDF pages that failed while their siblings went through.
    pub failed_pages: usize,
    /// Whether the completion notice was sent.
    pub completion_sent: bool,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_json_is_tagged() {
        let json = serde_json::to_string(&SurfaceNotice::Placeholder).unwrap();
        assert_eq!(json, r#"{"type":"placeholder"}"#);

        let done = SurfaceNotice::Completion(CompletionSignal {
            previews_delivered: 4,
            renders_settled: true,
        });
        let json = serde_json::to_string(&done).unwrap();
        assert!(json.contains(r#""type":"completion""#), "got: {json}");
        assert!(json.contains(r#""previews_delivered":4"#), "got: {json}");
    }

    #[test]
    fn preview_unit_json_keeps_missing_page() {
        let unit = PreviewUnit {
            message_id: "m".into(),
            part_name: "1".into(),
            page_number: None,
            image: "data:image/png;base64,AA==".into(),
            is_last_of_batch: false,
            total_expected: None,
        };
        let json = serde_json::to_value(SurfaceNotice::Preview(unit)).unwrap();
        assert_eq!(json["type"], "preview");
        assert!(json["page_number"].is_null());
    }
}
