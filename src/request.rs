//! What the caller asks for: an input file, a target format and optional
//! conversion metadata.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Optional output-shaping parameters, forwarded verbatim to the service
/// under `conversion_metadata`.
///
/// The client does not validate these values; the service does. Keys not
/// covered by a named field can be placed in `extra` and are serialised
/// alongside the named ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    /// `original`, `1:1`, `4:3`, `16:9`, `9:16`, `21:9` or `custom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// `fit`, `crop-center`, `crop-top`, `crop-bottom`, `crop-left` or `crop-right`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_strategy: Option<String>,

    /// Compression quality 1–100 (JPG, WebP, AVIF, HEIC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,

    /// ICO size in pixels: 16, 32, 48, 64, 128 or 256.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_height: Option<u32>,

    /// Used with `aspect_ratio = "custom"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_width: Option<u32>,

    /// Used with `aspect_ratio = "custom"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_height: Option<u32>,

    /// Any other service-side option.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversionMetadata {
    /// `true` when no field is set; empty metadata is not sent at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single conversion: which file, into what, written where.
///
/// # Example
/// ```rust
/// use convertorio::{ConversionMetadata, ConversionRequest};
///
/// let request = ConversionRequest::new("./photo.png", "WebP")
///     .output_path("./out/photo.webp")
///     .metadata(ConversionMetadata {
///         quality: Some(85),
///         ..Default::default()
///     });
/// assert_eq!(request.target_format(), "webp");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub target_format: String,
    pub output_path: Option<PathBuf>,
    pub metadata: Option<ConversionMetadata>,
}

impl ConversionRequest {
    pub fn new(input_path: impl Into<PathBuf>, target_format: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            target_format: target_format.into(),
            output_path: None,
            metadata: None,
        }
    }

    /// Write the result here instead of next to the input.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn metadata(mut self, metadata: ConversionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Target format, trimmed and lowercased, as sent to the service.
    pub fn target_format(&self) -> String {
        self.target_format.trim().to_lowercase()
    }

    /// Source format inferred from the input extension, lowercased.
    /// Empty when the input has no extension.
    pub fn source_format(&self) -> String {
        extension_lowercase(&self.input_path)
    }

    /// The input's file name, as reported to the service.
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Where the converted file will be written: the explicit output path,
    /// or the input path with its extension replaced by the target format.
    pub fn resolved_output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(p) => p.clone(),
            None => self.input_path.with_extension(self.target_format()),
        }
    }

    /// Check the preconditions that do not need the filesystem.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.input_path.as_os_str().is_empty() {
            return Err(ConvertError::Validation("input path is required".into()));
        }
        let target = self.target_format();
        if target.is_empty() {
            return Err(ConvertError::Validation("target format is required".into()));
        }
        if !target.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConvertError::Validation(format!(
                "target format must be a format token like 'jpg' or 'webp', got '{}'",
                self.target_format
            )));
        }
        Ok(())
    }
}

fn extension_lowercase(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
