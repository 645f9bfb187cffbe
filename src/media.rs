use std::path::Path;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Fixed mapping used on the wire, regardless of the actual encoding.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "heic" | "heif" | "gif" | "webp" => Some(MediaKind::Image),
            "mp4" | "mov" | "m4v" | "avi" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A photo or video held in memory for the duration of an upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    id: Uuid,
    kind: MediaKind,
    payload: Vec<u8>,
    filename: String,
}

impl MediaItem {
    pub fn new(kind: MediaKind, payload: Vec<u8>, filename: impl Into<String>) -> AppResult<Self> {
        let filename = filename.into();
        InputValidator::validate_filename(&filename)?;

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            filename,
        })
    }

    /// Loads a file from disk, picking the kind from its extension.
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let path_str = path.to_string_lossy();
        let kind = InputValidator::validate_media_path(&path_str)?;

        let payload = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| InputValidator::sanitize_filename(&name.to_string_lossy()))
            .ok_or_else(|| AppError::validation("file_path", "Path has no file name"))?;

        log::debug!(
            "Loaded {} ({:?}, {} bytes)",
            filename,
            kind,
            payload.len()
        );

        Self::new(kind, payload, filename)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_mapping() {
        let photo = MediaItem::new(MediaKind::Image, vec![1, 2, 3], "IMG_0001.png").unwrap();
        assert_eq!(photo.mime_type(), "image/jpeg");

        let clip = MediaItem::new(MediaKind::Video, Vec::new(), "clip.mov").unwrap();
        assert_eq!(clip.mime_type(), "video/mp4");
        assert!(clip.payload().is_empty());
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("heic"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("MOV"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn test_new_rejects_bad_filenames() {
        assert!(MediaItem::new(MediaKind::Image, vec![0], "").is_err());
        assert!(MediaItem::new(MediaKind::Image, vec![0], "evil\"name.jpg").is_err());
    }

    #[test]
    fn test_new_accepts_long_filenames() {
        let filename = format!("{}.jpg", "long_holiday_name_".repeat(20));
        assert!(filename.chars().count() > 300);

        let item = MediaItem::new(MediaKind::Image, vec![0], filename.clone()).unwrap();
        assert_eq!(item.filename(), filename);
    }

    #[test]
    fn test_items_get_distinct_ids() {
        let a = MediaItem::new(MediaKind::Image, vec![0], "photo.jpg").unwrap();
        let b = MediaItem::new(MediaKind::Image, vec![0], "photo.jpg").unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let path = std::env::temp_dir().join(format!("lps_media_{}.mp4", Uuid::new_v4()));
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();

        let item = MediaItem::from_path(&path).await;
        let _ = std::fs::remove_file(&path);

        let item = item.unwrap();
        assert_eq!(item.kind(), MediaKind::Video);
        assert_eq!(item.payload(), b"\x00\x00\x00\x18ftypmp42");
        assert!(item.filename().starts_with("lps_media_"));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = MediaItem::from_path(Path::new("definitely_missing_clip.mp4")).await;
        assert!(matches!(result, Err(AppError::FileNotFound { .. })));
    }
}
