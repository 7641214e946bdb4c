//! Attachment sources: where attachment lists and bytes come from.
//!
//! The pipeline never touches a mail store directly. It talks to an
//! [`AttachmentSource`], which the host client implements over its own
//! message database. [`EmlDirectorySource`] is the implementation used by the
//! CLI: a directory of `.eml` files addressed by relative path.

mod eml;

pub use eml::EmlDirectorySource;

use crate::error::PreviewError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a displayed message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Descriptor of one attachment, as listed by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    /// Identity of the attachment within its message.
    pub part_name: String,
    /// MIME type as declared by the message, e.g. `application/pdf`.
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: u64,
    /// Declared file name, if any.
    pub name: Option<String>,
}

/// A store of messages the pipeline can read attachments from.
///
/// Both methods may fail; the pipeline treats every failure as local to the
/// attachment (or message) it concerns.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// List the attachments of a message in MIME order.
    async fn list_attachments(&self, message: &MessageId) -> Result<Vec<AttachmentInfo>, PreviewError>;

    /// Materialise the decoded bytes of one attachment.
    async fn fetch_attachment(&self, message: &MessageId, part_name: &str) -> Result<Vec<u8>, PreviewError>;
}
