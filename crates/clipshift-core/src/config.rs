//! Configuration module
//!
//! Two kinds of configuration live here:
//!
//! - [`Configuration`]: the hot-reloadable feature toggles both hooks consult.
//!   It is published through a [`ConfigGate`], which hands out immutable
//!   snapshots so a hook never sees a reload halfway through.
//! - [`ProcessingConfig`]: static process settings (transcoder binary, scratch
//!   directory, log format) read once at start-up.

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::error::ConfigError;

// Setting keys as the platform's plugin settings name them
pub const CONVERT_MOV_TO_MP4_KEY: &str = "ConvertMOVToMP4";
pub const CREATE_PREVIEW_IMAGE_KEY: &str = "CreatePreviewImage";
pub const CONVERSION_FILE_SIZE_LIMIT_KEY: &str = "ConversionFileSizeLimit";
pub const PREVIEW_FILE_SIZE_LIMIT_KEY: &str = "PreviewFileSizeLimit";

const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

/// Feature toggles consulted by the upload and post hooks.
///
/// Size limits are in bytes; zero or a negative value means "no limit".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub convert_mov_to_mp4: bool,
    pub create_preview_image: bool,
    pub conversion_file_size_limit: i64,
    pub preview_file_size_limit: i64,
}

impl Configuration {
    /// Coerce the platform's plugin settings object into a configuration.
    ///
    /// Missing keys fall back to defaults and unknown keys are ignored.
    /// Booleans may arrive as JSON booleans or as `"true"`/`"false"`; limits
    /// as numbers or numeric strings.
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigError> {
        let empty = Map::new();
        let map = match settings {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => return Err(ConfigError::NotAnObject(other.to_string())),
        };

        Ok(Self {
            convert_mov_to_mp4: coerce_bool(map, CONVERT_MOV_TO_MP4_KEY)?,
            create_preview_image: coerce_bool(map, CREATE_PREVIEW_IMAGE_KEY)?,
            conversion_file_size_limit: coerce_limit(map, CONVERSION_FILE_SIZE_LIMIT_KEY)?,
            preview_file_size_limit: coerce_limit(map, PREVIEW_FILE_SIZE_LIMIT_KEY)?,
        })
    }

    pub fn from_env() -> Self {
        Self {
            convert_mov_to_mp4: env::var("CLIPSHIFT_CONVERT_MOV_TO_MP4")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            create_preview_image: env::var("CLIPSHIFT_CREATE_PREVIEW_IMAGE")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            conversion_file_size_limit: env::var("CLIPSHIFT_CONVERSION_FILE_SIZE_LIMIT")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            preview_file_size_limit: env::var("CLIPSHIFT_PREVIEW_FILE_SIZE_LIMIT")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
        }
    }

    pub fn conversion_limit(&self) -> Option<u64> {
        positive_limit(self.conversion_file_size_limit)
    }

    pub fn preview_limit(&self) -> Option<u64> {
        positive_limit(self.preview_file_size_limit)
    }

    /// True when a file of `size` bytes is too large to convert.
    pub fn exceeds_conversion_limit(&self, size: i64) -> bool {
        exceeds(self.conversion_limit(), size)
    }

    /// True when a file of `size` bytes is too large to preview.
    pub fn exceeds_preview_limit(&self, size: i64) -> bool {
        exceeds(self.preview_limit(), size)
    }
}

fn positive_limit(limit: i64) -> Option<u64> {
    u64::try_from(limit).ok().filter(|l| *l > 0)
}

fn exceeds(limit: Option<u64>, size: i64) -> bool {
    match (limit, u64::try_from(size)) {
        (Some(limit), Ok(size)) => size > limit,
        _ => false,
    }
}

fn coerce_bool(map: &Map<String, Value>, key: &'static str) -> Result<bool, ConfigError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            _ => Err(invalid(key, "a boolean", s)),
        },
        Some(other) => Err(invalid(key, "a boolean", other)),
    }
}

fn coerce_limit(map: &Map<String, Value>, key: &'static str) -> Result<i64, ConfigError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| invalid(key, "an integer byte count", n)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| invalid(key, "an integer byte count", s)),
        Some(other) => Err(invalid(key, "an integer byte count", other)),
    }
}

fn invalid(key: &'static str, expected: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        expected,
        value: value.to_string(),
    }
}

/// Process-wide holder of the active [`Configuration`].
///
/// Writers install a whole new value; readers take an `Arc` snapshot and keep
/// it for the rest of their invocation.
#[derive(Debug, Default)]
pub struct ConfigGate {
    current: RwLock<Arc<Configuration>>,
}

impl ConfigGate {
    pub fn new(config: Configuration) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<Configuration> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn replace(&self, config: Configuration) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(config);
    }
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Static settings read once when the process starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub ffmpeg_path: String,
    /// Directory for scratch files; `None` uses the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: DEFAULT_FFMPEG_PATH.to_string(),
            scratch_dir: None,
            log_format: LogFormat::Text,
        }
    }
}

impl ProcessingConfig {
    pub fn from_env() -> Self {
        Self {
            ffmpeg_path: env::var("FFMPEG_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FFMPEG_PATH.to_string()),
            scratch_dir: env::var("CLIPSHIFT_SCRATCH_DIR")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_default()
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_settings_reads_known_keys() {
        let config = Configuration::from_settings(&json!({
            "ConvertMOVToMP4": true,
            "CreatePreviewImage": "true",
            "ConversionFileSizeLimit": 1048576,
            "PreviewFileSizeLimit": "2048",
            "SomethingElse": [1, 2, 3],
        }))
        .unwrap();

        assert!(config.convert_mov_to_mp4);
        assert!(config.create_preview_image);
        assert_eq!(config.conversion_file_size_limit, 1048576);
        assert_eq!(config.preview_file_size_limit, 2048);
    }

    #[test]
    fn test_from_settings_defaults() {
        let config = Configuration::from_settings(&json!({})).unwrap();
        assert_eq!(config, Configuration::default());

        let config = Configuration::from_settings(&Value::Null).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_from_settings_rejects_wrong_shapes() {
        assert!(matches!(
            Configuration::from_settings(&json!("nope")),
            Err(ConfigError::NotAnObject(_))
        ));
        assert!(matches!(
            Configuration::from_settings(&json!({"ConvertMOVToMP4": "yes please"})),
            Err(ConfigError::InvalidValue { key: CONVERT_MOV_TO_MP4_KEY, .. })
        ));
        assert!(matches!(
            Configuration::from_settings(&json!({"ConversionFileSizeLimit": "ten"})),
            Err(ConfigError::InvalidValue { key: CONVERSION_FILE_SIZE_LIMIT_KEY, .. })
        ));
    }

    #[test]
    fn test_limits_zero_or_negative_mean_unlimited() {
        let mut config = Configuration::default();
        assert_eq!(config.conversion_limit(), None);
        assert!(!config.exceeds_conversion_limit(i64::MAX));

        config.conversion_file_size_limit = -5;
        assert_eq!(config.conversion_limit(), None);
        assert!(!config.exceeds_conversion_limit(1_000));

        config.conversion_file_size_limit = 1;
        assert_eq!(config.conversion_limit(), Some(1));
        assert!(!config.exceeds_conversion_limit(1));
        assert!(config.exceeds_conversion_limit(2));
    }

    #[test]
    fn test_preview_limit() {
        let config = Configuration {
            preview_file_size_limit: 100,
            ..Default::default()
        };
        assert!(config.exceeds_preview_limit(101));
        assert!(!config.exceeds_preview_limit(100));
        assert!(!config.exceeds_conversion_limit(101));
    }

    #[test]
    fn test_gate_snapshot_survives_replace() {
        let gate = ConfigGate::new(Configuration {
            convert_mov_to_mp4: true,
            ..Default::default()
        });

        let before = gate.snapshot();
        gate.replace(Configuration::default());
        let after = gate.snapshot();

        assert!(before.convert_mov_to_mp4);
        assert!(!after.convert_mov_to_mp4);
    }

    #[test]
    fn test_gate_concurrent_readers_see_whole_values() {
        let gate = Arc::new(ConfigGate::default());
        let writer = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let on = i % 2 == 0;
                    gate.replace(Configuration {
                        convert_mov_to_mp4: on,
                        create_preview_image: on,
                        conversion_file_size_limit: if on { 10 } else { 20 },
                        preview_file_size_limit: if on { 10 } else { 20 },
                    });
                }
            })
        };

        for _ in 0..200 {
            let snap = gate.snapshot();
            assert_eq!(snap.convert_mov_to_mp4, snap.create_preview_image);
            assert_eq!(snap.conversion_file_size_limit, snap.preview_file_size_limit);
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_processing_config_default() {
        let config = ProcessingConfig::default();
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert!(config.scratch_dir.is_none());
        assert_eq!(config.log_format, LogFormat::Text);
    }
}
