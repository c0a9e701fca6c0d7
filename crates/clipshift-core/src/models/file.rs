use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata the platform keeps for an uploaded file.
///
/// The platform owns the stored record. Hooks receive a reference and hand
/// back a modified copy; they never write to the stored record themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Extension without the leading dot, as reported by the platform.
    pub extension: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub thumbnail_path: String,
    #[serde(default)]
    pub preview_path: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub creator_id: Option<String>,
    /// Creation time in milliseconds since the epoch.
    #[serde(default)]
    pub create_at: i64,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            ..Default::default()
        }
    }

    /// Lowercased extension, for case-insensitive policy checks.
    pub fn normalized_extension(&self) -> String {
        self.extension.trim_start_matches('.').to_lowercase()
    }

    /// Final path component of `name`.
    pub fn base_name(&self) -> &str {
        Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    /// `name` with its last extension replaced by `extension`.
    ///
    /// A name without a dot gets the extension appended.
    pub fn name_with_extension(&self, extension: &str) -> String {
        let stem = match self.name.rfind('.') {
            Some(idx) => &self.name[..idx],
            None => self.name.as_str(),
        };
        format!("{}.{}", stem, extension)
    }

    /// Copy describing the same upload re-encoded into another container.
    ///
    /// Derived media paths are cleared since they described the old bytes.
    pub fn converted(&self, extension: &str, mime_type: &str, size: i64) -> Self {
        Self {
            name: self.name_with_extension(extension),
            extension: extension.to_string(),
            mime_type: mime_type.to_string(),
            size,
            thumbnail_path: String::new(),
            preview_path: String::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_with_extension_replaces_last() {
        let info = FileDescriptor::new("clip.mov", "mov");
        assert_eq!(info.name_with_extension("mp4"), "clip.mp4");

        let info = FileDescriptor::new("holiday.2024.MOV", "MOV");
        assert_eq!(info.name_with_extension("mp4"), "holiday.2024.mp4");
    }

    #[test]
    fn test_name_without_dot_appends() {
        let info = FileDescriptor::new("clip", "mov");
        assert_eq!(info.name_with_extension("mp4"), "clip.mp4");
    }

    #[test]
    fn test_base_name_strips_directories() {
        let info = FileDescriptor::new("test_assets/clip.mov", "mov");
        assert_eq!(info.base_name(), "clip.mov");
    }

    #[test]
    fn test_normalized_extension() {
        assert_eq!(FileDescriptor::new("a.MOV", "MOV").normalized_extension(), "mov");
        assert_eq!(FileDescriptor::new("a.mov", ".mov").normalized_extension(), "mov");
    }

    #[test]
    fn test_converted_clears_derived_paths() {
        let mut info = FileDescriptor::new("clip.mov", "mov");
        info.id = "file1".to_string();
        info.mime_type = "video/quicktime".to_string();
        info.thumbnail_path = "thumb.jpg".to_string();
        info.preview_path = "preview.jpg".to_string();

        let converted = info.converted("mp4", "video/mp4", 42);
        assert_eq!(converted.id, "file1");
        assert_eq!(converted.name, "clip.mp4");
        assert_eq!(converted.extension, "mp4");
        assert_eq!(converted.mime_type, "video/mp4");
        assert_eq!(converted.size, 42);
        assert!(converted.thumbnail_path.is_empty());
        assert!(converted.preview_path.is_empty());
        // Original untouched
        assert_eq!(info.extension, "mov");
    }
}
