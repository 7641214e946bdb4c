//! Full view of a single attachment.
//!
//! Clicking a delivered preview asks the host to open a popup viewer for that
//! attachment (and page, for PDFs). The request travels as a query string:
//!
//! ```text
//! partname=2&numPage=3&messageId=inbox%2F42.eml
//! ```
//!
//! `numPage=0` (or no `numPage` at all) means "the whole attachment", which
//! for a PDF is its first page.

use crate::error::{PageError, PreviewError};
use crate::pipeline::classify::{classify, AttachmentKind};
use crate::pipeline::encode::data_url;
use crate::pipeline::thumbnail::render_page_thumbnail;
use crate::preview::PreviewPipeline;
use crate::source::MessageId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const PART_KEY: &str = "partname";
const PAGE_KEY: &str = "numPage";
const MESSAGE_KEY: &str = "messageId";

/// What the user clicked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullViewRequest {
    pub part_name: String,
    /// 1-based PDF page; `None` for images and "whole attachment".
    pub page_number: Option<u32>,
    pub message_id: MessageId,
}

impl FullViewRequest {
    pub fn new(message_id: MessageId, part_name: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            part_name: part_name.into(),
            page_number: page_number.filter(|&p| p > 0),
            message_id,
        }
    }

    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(PART_KEY, &self.part_name)
            .append_pair(PAGE_KEY, &self.page_number.unwrap_or(0).to_string())
            .append_pair(MESSAGE_KEY, self.message_id.as_str())
            .finish()
    }

    /// Parse a query string produced by [`FullViewRequest::to_query`].
    ///
    /// A leading `?` is accepted. Unknown keys are ignored.
    pub fn from_query(query: &str) -> Result<Self, PreviewError> {
        let invalid = |reason: String| PreviewError::InvalidFullView {
            query: query.to_string(),
            reason,
        };

        let mut part_name = None;
        let mut page = None;
        let mut message_id = None;
        let trimmed = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in form_urlencoded::parse(trimmed.as_bytes()) {
            match key.as_ref() {
                PART_KEY => part_name = Some(value.into_owned()),
                PAGE_KEY => page = Some(value.into_owned()),
                MESSAGE_KEY => message_id = Some(value.into_owned()),
                _ => {}
            }
        }

        let part_name = part_name
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid(format!("missing '{}'", PART_KEY)))?;
        let message_id = message_id
            .filter(|m| !m.is_empty())
            .ok_or_else(|| invalid(format!("missing '{}'", MESSAGE_KEY)))?;
        let page_number = match page.as_deref() {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| invalid(format!("bad '{}' value '{}': {}", PAGE_KEY, raw, e)))?,
        };

        Ok(Self::new(MessageId::new(message_id), part_name, Some(page_number)))
    }
}

/// Kind of window the host should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Popup,
}

/// Window the host opens for a full view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub kind: WindowKind,
    pub width: u32,
    pub height: u32,
    /// Query string identifying the attachment, for hosts that load the
    /// viewer from a URL.
    pub query: String,
}

/// A resolved full-view request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullView {
    pub window: WindowSpec,
    /// `data:` URL of the image to show.
    pub image: String,
}

impl PreviewPipeline {
    /// Resolve a full-view request into a window and the image to show in it.
    ///
    /// Images pass through unchanged. PDF pages are rendered into the
    /// full-view box under the same timeout as thumbnails.
    pub async fn open_full_view(&self, request: &FullViewRequest) -> Result<FullView, PreviewError> {
        let message = &request.message_id;
        let attachments = self.source().list_attachments(message).await?;
        let attachment = attachments
            .into_iter()
            .find(|a| a.part_name == request.part_name)
            .ok_or_else(|| PreviewError::UnknownAttachment {
                message_id: message.to_string(),
                part_name: request.part_name.clone(),
            })?;

        let kind = classify(&attachment.content_type);
        if kind == AttachmentKind::Other {
            return Err(PreviewError::InvalidFullView {
                query: request.to_query(),
                reason: format!("'{}' has no preview", attachment.content_type),
            });
        }

        let bytes = self
            .source()
            .fetch_attachment(message, &request.part_name)
            .await?;

        let image = match kind {
            AttachmentKind::Pdf => self.render_full_page(request, bytes).await?,
            _ => data_url(&attachment.content_type, &bytes),
        };

        let target = self.config().full_view_box;
        info!(
            "{}: full view of '{}' page {}",
            message,
            request.part_name,
            request.page_number.unwrap_or(0)
        );
        Ok(FullView {
            window: WindowSpec {
                kind: WindowKind::Popup,
                width: target.width,
                height: target.height,
                query: request.to_query(),
            },
            image,
        })
    }

    async fn render_full_page(&self, request: &FullViewRequest, bytes: Vec<u8>) -> Result<String, PreviewError> {
        let config = self.config();
        let page = request.page_number.unwrap_or(1);
        let target = config.full_view_box;
        let quality = config.jpeg_quality;
        let secs = config.render_timeout_secs;
        let part_name = request.part_name.clone();
        let backend = Arc::clone(self.backend());
        debug!("{}: rendering page {} into {}x{}", part_name, page, target.width, target.height);

        let task = tokio::task::spawn_blocking(move || -> Result<String, PreviewError> {
            let document = backend.open(&part_name, Arc::from(bytes))?;
            if page > document.page_count() {
                return Err(PreviewError::InvalidFullView {
                    query: format!("{}={}", PAGE_KEY, page),
                    reason: format!("document has {} pages", document.page_count()),
                });
            }
            render_page_thumbnail(document.as_ref(), page, target, quality)
                .map_err(|e: PageError| PreviewError::RenderBackend {
                    part_name: part_name.clone(),
                    detail: e.to_string(),
                })
        });

        match tokio::time::timeout(Duration::from_secs(secs), task).await {
            Ok(joined) => joined.map_err(|e| PreviewError::Internal(format!("Render task panicked: {}", e)))?,
            Err(_) => Err(PreviewError::RenderTimeout {
                part_name: request.part_name.clone(),
                secs,
            }),
        }
    }
}
