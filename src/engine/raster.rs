//! Raster engine built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image::ImageReader` |
//! | Resize | `image::DynamicImage::resize` with `Lanczos3` |
//! | Adaptive resize | `image::DynamicImage::resize_to_fill` |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Rotate | `rotate90` / `rotate180` / `rotate270` |
//! | Watermark | `image::imageops::overlay` on an RGBA canvas |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality from options) |
//! | Encode → PNG / GIF | `DynamicImage::write_to` |

use super::backend::{Dimensions, EngineError, EngineHandle, EngineSource, TransformEngine};
use crate::ops::{EngineOptions, OutputFormat, Rotation, TransformOp, WatermarkPosition};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Watermarking skips canvases at or below this edge length; there is no
/// room to place a visible mark.
const WATERMARK_MIN_CANVAS: u32 = 10;

/// Production engine. Stateless; each `create` call decodes one source.
pub struct RasterEngine;

impl RasterEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, EngineError> {
    ImageReader::open(path)
        .map_err(EngineError::Io)?
        .decode()
        .map_err(|e| EngineError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Decode an image from an in-memory buffer, sniffing the format.
fn load_bytes(bytes: &[u8]) -> Result<DynamicImage, EngineError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(EngineError::Io)?
        .decode()
        .map_err(|e| EngineError::Decode {
            path: "<bytes>".into(),
            reason: e.to_string(),
        })
}

impl TransformEngine for RasterEngine {
    type Handle = RasterImage;

    fn create(
        &self,
        source: EngineSource<'_>,
        options: &EngineOptions,
    ) -> Result<Self::Handle, EngineError> {
        let img = match source {
            EngineSource::Path(path) => load_image(path)?,
            EngineSource::Bytes(bytes) => load_bytes(bytes)?,
        };
        Ok(RasterImage {
            img,
            options: *options,
        })
    }

    /// The raster engine replays the full transform vocabulary.
    fn supports(&self, _op: &TransformOp) -> bool {
        true
    }
}

/// A decoded image plus the options it was bound with.
pub struct RasterImage {
    img: DynamicImage,
    options: EngineOptions,
}

impl RasterImage {
    fn resize(&mut self, width: u32, height: u32) {
        let (mut width, mut height) = (width, height);
        if !self.options.resize_up {
            width = width.min(self.img.width());
            height = height.min(self.img.height());
        }
        self.img = self.img.resize(width, height, FilterType::Lanczos3);
    }

    fn resize_percent(&mut self, percent: u32) {
        let width = (self.img.width() as u64 * percent as u64 / 100).max(1) as u32;
        let height = (self.img.height() as u64 * percent as u64 / 100).max(1) as u32;
        self.img = self.img.resize_exact(width, height, FilterType::Lanczos3);
    }

    fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<(), EngineError> {
        let (img_w, img_h) = (self.img.width(), self.img.height());
        if x >= img_w || y >= img_h {
            return Err(EngineError::OperationFailed(format!(
                "crop origin ({x}, {y}) outside image {img_w}x{img_h}"
            )));
        }
        // Overflowing regions are clamped to the image edge
        let width = width.min(img_w - x);
        let height = height.min(img_h - y);
        if width == 0 || height == 0 {
            return Err(EngineError::OperationFailed("empty crop region".into()));
        }
        self.img = self.img.crop_imm(x, y, width, height);
        Ok(())
    }

    fn crop_from_center(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        let width = width.min(self.img.width());
        let height = height.min(self.img.height());
        let x = (self.img.width() - width) / 2;
        let y = (self.img.height() - height) / 2;
        self.crop(x, y, width, height)
    }

    fn watermark(
        &mut self,
        mask: &Path,
        position: WatermarkPosition,
        padding: u32,
    ) -> Result<(), EngineError> {
        let (canvas_w, canvas_h) = (self.img.width(), self.img.height());
        if canvas_w <= WATERMARK_MIN_CANVAS || canvas_h <= WATERMARK_MIN_CANVAS {
            return Ok(());
        }

        let mut stamp = load_image(mask)?;
        let mut padding = padding as i64;

        // An oversized mask is halved rather than fitted, keeping its
        // proportions recognizable against the canvas.
        if stamp.width() > canvas_w || stamp.height() > canvas_h {
            stamp = stamp.resize_exact(
                (stamp.width() / 2).max(1),
                (stamp.height() / 2).max(1),
                FilterType::Lanczos3,
            );
            padding /= 2;
        }

        let (stamp_w, stamp_h) = (stamp.width() as i64, stamp.height() as i64);
        let (canvas_w, canvas_h) = (canvas_w as i64, canvas_h as i64);
        let (x, y) = match position {
            WatermarkPosition::Center => ((canvas_w - stamp_w) / 2, (canvas_h - stamp_h) / 2),
            WatermarkPosition::CenterTop => ((canvas_w - stamp_w) / 2, padding),
            WatermarkPosition::LeftTop => (padding, padding),
            WatermarkPosition::RightTop => (canvas_w - padding - stamp_w, padding),
            WatermarkPosition::LeftBottom => (padding, canvas_h - padding - stamp_h),
            WatermarkPosition::RightBottom => {
                (canvas_w - padding - stamp_w, canvas_h - padding - stamp_h)
            }
            WatermarkPosition::CenterBottom => {
                ((canvas_w - stamp_w) / 2, canvas_h - padding - stamp_h)
            }
        };

        // Composite on an RGBA canvas so mask transparency blends
        let mut canvas = self.img.to_rgba8();
        image::imageops::overlay(&mut canvas, &stamp.to_rgba8(), x, y);
        self.img = DynamicImage::ImageRgba8(canvas);
        Ok(())
    }
}

impl EngineHandle for RasterImage {
    fn apply(&mut self, op: &TransformOp) -> Result<(), EngineError> {
        match op {
            TransformOp::Resize { width, height } => self.resize(*width, *height),
            TransformOp::AdaptiveResize { width, height } => {
                self.img = self.img.resize_to_fill(*width, *height, FilterType::Lanczos3);
            }
            TransformOp::ResizePercent { percent } => self.resize_percent(*percent),
            TransformOp::Crop {
                x,
                y,
                width,
                height,
            } => self.crop(*x, *y, *width, *height)?,
            TransformOp::CropFromCenter { width, height } => {
                self.crop_from_center(*width, *height)?
            }
            TransformOp::Rotate { rotation } => {
                self.img = match rotation {
                    Rotation::Deg90 => self.img.rotate90(),
                    Rotation::Deg180 => self.img.rotate180(),
                    Rotation::Deg270 => self.img.rotate270(),
                };
            }
            TransformOp::Watermark {
                mask,
                position,
                padding,
            } => self.watermark(mask, *position, *padding)?,
            // Format changes take effect at persist time; the op is recorded
            // so a change still distinguishes the cache entry.
            TransformOp::SetFormat { .. } => {}
        }
        Ok(())
    }

    fn persist(&self, dest: &Path, format: OutputFormat) -> Result<(), EngineError> {
        let file = std::fs::File::create(dest).map_err(EngineError::Io)?;
        let mut writer = std::io::BufWriter::new(file);
        let encode_err = |e: image::ImageError| EngineError::Encode {
            path: dest.display().to_string(),
            reason: e.to_string(),
        };

        match format {
            OutputFormat::Jpg => {
                // JPEG carries no alpha channel
                let rgb = self.img.to_rgb8();
                image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut writer,
                    self.options.jpeg_quality.value() as u8,
                )
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(encode_err)
            }
            OutputFormat::Png => self
                .img
                .write_to(&mut writer, ImageFormat::Png)
                .map_err(encode_err),
            OutputFormat::Gif => DynamicImage::ImageRgba8(self.img.to_rgba8())
                .write_to(&mut writer, ImageFormat::Gif)
                .map_err(encode_err),
        }
    }

    fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions {
            width: self.img.width(),
            height: self.img.height(),
        })
    }
}
