//! Transform vocabulary and engine options.
//!
//! These types describe *what* to do to an image, not *how* to do it. A
//! [`TransformOp`] is recorded on a handle long before any pixel work happens;
//! the ordered list of recorded ops is both the replay script for the engine
//! and the input to the cache key, so every variant carries its arguments in a
//! serializable form.
//!
//! ## Types
//!
//! - [`TransformOp`] — closed enumeration of the supported operations.
//! - [`OutputFormat`] — the closed output format set (gif, jpg, png).
//! - [`WatermarkPosition`] — seven-position placement grid for watermarks.
//! - [`Rotation`] — quarter-turn rotations.
//! - [`Quality`] — lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`EngineOptions`] — per-handle engine settings (JPEG quality, upscale policy).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Output format for materialized images.
///
/// The set is closed: formats the engine can decode but not encode (tiff,
/// webp, ...) are not valid outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Gif,
    Jpg,
    Png,
}

impl OutputFormat {
    /// Parse a format name or file extension. `jpeg` is accepted as an alias
    /// for `jpg`; matching is case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Derive the format from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }

    /// Canonical file extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Watermark placement on the canvas.
///
/// The two-letter codes match the convention used by overlay tooling:
/// `cc`, `ct`, `lt`, `rt`, `lb`, `rb`, `cb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPosition {
    Center,
    CenterTop,
    LeftTop,
    RightTop,
    LeftBottom,
    RightBottom,
    CenterBottom,
}

impl WatermarkPosition {
    /// Parse a two-letter position code. Unknown codes fall back to `Center`,
    /// matching the overlay convention's default branch.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ct" => Self::CenterTop,
            "lt" => Self::LeftTop,
            "rt" => Self::RightTop,
            "lb" => Self::LeftBottom,
            "rb" => Self::RightBottom,
            "cb" => Self::CenterBottom,
            _ => Self::Center,
        }
    }
}

/// Quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

/// A single recorded transform.
///
/// Argument order within a variant is positional and significant: the history
/// is serialized as-is for cache keying, so `Resize { 200, 100 }` and
/// `Resize { 100, 200 }` are distinct cache entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    /// Proportional resize fitting inside `width` × `height`.
    Resize { width: u32, height: u32 },
    /// Resize to fill `width` × `height` exactly, center-cropping overflow.
    AdaptiveResize { width: u32, height: u32 },
    /// Proportional resize to a percentage of the current dimensions.
    ResizePercent { percent: u32 },
    /// Crop a region at (`x`, `y`) with the given size.
    Crop { x: u32, y: u32, width: u32, height: u32 },
    /// Crop a centered region of the given size.
    CropFromCenter { width: u32, height: u32 },
    Rotate { rotation: Rotation },
    /// Overlay a mask image at the given position with `padding` pixels of
    /// inset from the nearest edges.
    Watermark {
        mask: PathBuf,
        position: WatermarkPosition,
        padding: u32,
    },
    /// Re-encode to a different output format.
    SetFormat { format: OutputFormat },
}

impl TransformOp {
    /// Operation name as it appears in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resize { .. } => "resize",
            Self::AdaptiveResize { .. } => "adaptive_resize",
            Self::ResizePercent { .. } => "resize_percent",
            Self::Crop { .. } => "crop",
            Self::CropFromCenter { .. } => "crop_from_center",
            Self::Rotate { .. } => "rotate",
            Self::Watermark { .. } => "watermark",
            Self::SetFormat { .. } => "set_format",
        }
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Per-handle engine settings, passed at handle construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Quality for JPEG encoding.
    pub jpeg_quality: Quality,
    /// Whether proportional resizes may scale beyond the source dimensions.
    pub resize_up: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default(),
            resize_up: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse_accepts_aliases_and_case() {
        assert_eq!(OutputFormat::parse("jpg"), Some(OutputFormat::Jpg));
        assert_eq!(OutputFormat::parse("JPEG"), Some(OutputFormat::Jpg));
        assert_eq!(OutputFormat::parse("Png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("gif"), Some(OutputFormat::Gif));
        assert_eq!(OutputFormat::parse("webp"), None);
        assert_eq!(OutputFormat::parse(""), None);
    }

    #[test]
    fn format_from_path_uses_extension() {
        use std::path::Path;
        assert_eq!(
            OutputFormat::from_path(Path::new("/img/photo.JPG")),
            Some(OutputFormat::Jpg)
        );
        assert_eq!(OutputFormat::from_path(Path::new("/img/noext")), None);
    }

    #[test]
    fn position_codes_round_trip() {
        assert_eq!(WatermarkPosition::from_code("rb"), WatermarkPosition::RightBottom);
        assert_eq!(WatermarkPosition::from_code("ct"), WatermarkPosition::CenterTop);
        // Unknown codes default to center
        assert_eq!(WatermarkPosition::from_code("xx"), WatermarkPosition::Center);
    }

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn op_serialization_is_stable() {
        let op = TransformOp::Resize {
            width: 200,
            height: 100,
        };
        let a = serde_json::to_string(&op).unwrap();
        let b = serde_json::to_string(&op).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"op\":\"resize\""));
    }

    #[test]
    fn argument_order_changes_serialization() {
        let a = serde_json::to_string(&TransformOp::Resize {
            width: 200,
            height: 100,
        })
        .unwrap();
        let b = serde_json::to_string(&TransformOp::Resize {
            width: 100,
            height: 200,
        })
        .unwrap();
        assert_ne!(a, b);
    }
}
