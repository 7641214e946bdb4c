//! Directory-of-`.eml` attachment source.
//!
//! Message ids are paths relative to the root directory (`inbox/42.eml`).
//! Part names are the 1-based positions of the attachments in MIME order,
//! which is stable for a given file and survives missing filenames.

use super::{AttachmentInfo, AttachmentSource, MessageId};
use crate::error::PreviewError;
use async_trait::async_trait;
use mail_parser::{Message, MessageParser, MimeHeaders};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Reads messages from `.eml` files below a root directory.
#[derive(Debug, Clone)]
pub struct EmlDirectorySource {
    root: PathBuf,
}

impl EmlDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a message id onto a file below the root.
    ///
    /// Absolute ids and ids containing `..` are rejected so a crafted id cannot
    /// read outside the store.
    fn message_path(&self, message: &MessageId) -> Result<PathBuf, PreviewError> {
        let rel = Path::new(message.as_str());
        let well_formed = !message.as_str().is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(PreviewError::InvalidMessageId(message.to_string()));
        }
        Ok(self.root.join(rel))
    }

    async fn read_message(&self, message: &MessageId) -> Result<Vec<u8>, PreviewError> {
        let path = self.message_path(message)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| PreviewError::AttachmentList {
                message_id: message.to_string(),
                detail: format!("{}: {e}", path.display()),
            })
    }
}

#[async_trait]
impl AttachmentSource for EmlDirectorySource {
    async fn list_attachments(&self, message: &MessageId) -> Result<Vec<AttachmentInfo>, PreviewError> {
        let raw = self.read_message(message).await?;
        let parsed = MessageParser::default()
            .parse(raw.as_slice())
            .ok_or_else(|| PreviewError::AttachmentList {
                message_id: message.to_string(),
                detail: "not an RFC 5322 message".into(),
            })?;

        let attachments = describe_attachments(&parsed);
        debug!("{}: {} attachments", message, attachments.len());
        Ok(attachments)
    }

    async fn fetch_attachment(&self, message: &MessageId, part_name: &str) -> Result<Vec<u8>, PreviewError> {
        let raw = self
            .read_message(message)
            .await
            .map_err(|e| PreviewError::AttachmentFetch {
                message_id: message.to_string(),
                part_name: part_name.to_string(),
                detail: e.to_string(),
            })?;

        let position = part_name
            .parse::<usize>()
            .ok()
            .and_then(|p| p.checked_sub(1))
            .ok_or_else(|| PreviewError::UnknownAttachment {
                message_id: message.to_string(),
                part_name: part_name.to_string(),
            })?;

        let parsed = MessageParser::default()
            .parse(raw.as_slice())
            .ok_or_else(|| PreviewError::AttachmentFetch {
                message_id: message.to_string(),
                part_name: part_name.to_string(),
                detail: "message no longer parses".into(),
            })?;

        parsed
            .attachments()
            .nth(position)
            .map(|part| part.contents().to_vec())
            .ok_or_else(|| PreviewError::UnknownAttachment {
                message_id: message.to_string(),
                part_name: part_name.to_string(),
            })
    }
}

/// Build attachment descriptors from a parsed message.
fn describe_attachments(msg: &Message<'_>) -> Vec<AttachmentInfo> {
    msg.attachments()
        .enumerate()
        .map(|(idx, part)| {
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            AttachmentInfo {
                part_name: (idx + 1).to_string(),
                content_type,
                size: part.contents().len() as u64,
                name: part.attachment_name().map(String::from),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "From: alice@example.com\r\n\
To: bob@example.com\r\n\
Subject: report\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
\r\n\
--XX\r\n\
Content-Type: text/plain\r\n\
\r\n\
see attached\r\n\
--XX\r\n\
Content-Type: image/png; name=\"dot.png\"\r\n\
Content-Disposition: attachment; filename=\"dot.png\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGVsbG8=\r\n\
--XX\r\n\
Content-Type: text/csv; name=\"data.csv\"\r\n\
Content-Disposition: attachment; filename=\"data.csv\"\r\n\
\r\n\
a,b\r\n\
--XX--\r\n";

    fn store() -> (tempfile::TempDir, EmlDirectorySource) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("inbox")).unwrap();
        std::fs::write(dir.path().join("inbox/1.eml"), MESSAGE).unwrap();
        let source = EmlDirectorySource::new(dir.path());
        (dir, source)
    }

    #[tokio::test]
    async fn lists_attachments_in_mime_order() {
        let (_dir, source) = store();
        let list = source.list_attachments(&"inbox/1.eml".into()).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].part_name, "1");
        assert_eq!(list[0].content_type, "image/png");
        assert_eq!(list[0].name.as_deref(), Some("dot.png"));
        assert_eq!(list[1].part_name, "2");
        assert_eq!(list[1].content_type, "text/csv");
    }

    #[tokio::test]
    async fn fetches_decoded_bytes() {
        let (_dir, source) = store();
        let bytes = source
            .fetch_attachment(&"inbox/1.eml".into(), "1")
            .await
            .unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn unknown_part_is_reported() {
        let (_dir, source) = store();
        let err = source
            .fetch_attachment(&"inbox/1.eml".into(), "9")
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::UnknownAttachment { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn escaping_ids_are_rejected() {
        let (_dir, source) = store();
        for id in ["../etc/passwd", "/etc/passwd", ""] {
            let err = source.list_attachments(&id.into()).await.unwrap_err();
            assert!(matches!(err, PreviewError::InvalidMessageId(_)), "{id}: {err}");
        }
    }

    #[tokio::test]
    async fn missing_message_is_a_list_error() {
        let (_dir, source) = store();
        let err = source.list_attachments(&"inbox/404.eml".into()).await.unwrap_err();
        assert!(matches!(err, PreviewError::AttachmentList { .. }));
    }
}
