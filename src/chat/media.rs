//! Chat attachments stored on local disk and served under `/uploads`
//!
//! The stored extension is derived from the media type alone, so a file is
//! only ever served back as one of the allow-listed image, video or audio
//! types.

use std::path::PathBuf;
use uuid::Uuid;

use super::ChatError;

pub const PUBLIC_PREFIX: &str = "/uploads";

/// Accepted media types and the extension each one is stored under
const ALLOWED_TYPES: [(&str, &str); 15] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/quicktime", "mov"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/mp4", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("audio/aac", "aac"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/webm", "weba"),
];

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Stored extension for an accepted content type, parameters ignored
    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| *mime == essence)
            .map(|(_, ext)| *ext)
    }

    /// Write an attachment under a random name and return its public path
    pub async fn save(&self, content_type: &str, bytes: &[u8]) -> Result<String, ChatError> {
        let extension = Self::extension_for(content_type).ok_or_else(|| ChatError::Validation {
            field: "file".to_string(),
            message: format!("unsupported media type {}", content_type),
        })?;
        if bytes.is_empty() {
            return Err(ChatError::Validation {
                field: "file".to_string(),
                message: "is empty".to_string(),
            });
        }
        if bytes.len() > self.max_bytes {
            return Err(ChatError::TooLarge(self.max_bytes));
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ChatError::Media(e.to_string()))?;
        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| ChatError::Media(e.to_string()))?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Stored attachment");
        Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> MediaStore {
        MediaStore::new(std::env::temp_dir().join(format!("montirku-media-{}", Uuid::new_v4())), 16)
    }

    #[test]
    fn test_extension_comes_from_the_media_type() {
        assert_eq!(MediaStore::extension_for("image/png"), Some("png"));
        assert_eq!(MediaStore::extension_for("IMAGE/JPEG"), Some("jpg"));
        assert_eq!(MediaStore::extension_for("audio/ogg; codecs=opus"), Some("ogg"));
        assert_eq!(MediaStore::extension_for("video/mp4"), Some("mp4"));
        assert_eq!(MediaStore::extension_for("image/svg+xml"), None);
        assert_eq!(MediaStore::extension_for("text/html"), None);
        assert_eq!(MediaStore::extension_for("application/pdf"), None);
    }

    #[tokio::test]
    async fn test_save_writes_file_and_returns_public_path() {
        let media = scratch();
        let path = media.save("image/png", b"\x89PNG").await.unwrap();
        assert!(path.starts_with("/uploads/"));
        assert!(path.ends_with(".png"));

        let name = path.trim_start_matches("/uploads/");
        let stored = tokio::fs::read(media.root.join(name)).await.unwrap();
        assert_eq!(stored, b"\x89PNG");

        let _ = tokio::fs::remove_dir_all(&media.root).await;
    }

    #[tokio::test]
    async fn test_html_payload_is_never_stored_as_html() {
        let media = scratch();
        let path = media.save("image/png", b"<script>1</script>").await.unwrap();
        assert!(path.ends_with(".png"));
        assert!(!path.contains(".html"));

        assert!(matches!(
            media.save("text/html", b"<script>").await,
            Err(ChatError::Validation { .. })
        ));
        assert!(matches!(
            media.save("image/svg+xml", b"<svg/>").await,
            Err(ChatError::Validation { .. })
        ));

        let _ = tokio::fs::remove_dir_all(&media.root).await;
    }

    #[tokio::test]
    async fn test_save_rejects_bad_uploads() {
        let media = scratch();
        assert!(matches!(
            media.save("application/pdf", b"x").await,
            Err(ChatError::Validation { .. })
        ));
        assert!(matches!(
            media.save("image/png", &[0u8; 17]).await,
            Err(ChatError::TooLarge(16))
        ));
        assert!(matches!(
            media.save("audio/ogg", b"").await,
            Err(ChatError::Validation { .. })
        ));
    }
}
