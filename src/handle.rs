//! Image handles: transform recording and materialization.
//!
//! An [`ImageHandle`] is created per logical image request. Transform calls
//! are recorded, not executed — the handle accumulates an ordered history
//! that is only replayed when [`materialize`](ImageHandle::materialize) runs
//! and the cache has no fresh artifact for it.
//!
//! ## Sticky errors
//!
//! Handles never return `Result` from their public surface. Every failure is
//! appended to an ordered error list, and the first recorded error turns all
//! further recording and the whole materialization state machine into
//! no-ops. Callers check [`errors`](ImageHandle::errors) (or render, which
//! degrades to a visible indicator). The worst failure mode is a degraded
//! render, never a panic.
//!
//! ## Materialization
//!
//! ```text
//! errors? ──yes──▶ degraded record
//!   │no
//! history empty? ──yes──▶ bind source directly (no cache touched)
//!   │no
//! key + shard dir ─▶ ensure dir ─▶ writability probe
//!   │
//! cache file fresh? ──yes──▶ bind cached artifact
//!   │no
//! bind source ─▶ replay history ─▶ persist (temp file + rename)
//! ```

use crate::cache;
use crate::config::{Config, ConfigError};
use crate::engine::{EngineError, EngineHandle, EngineSource, RasterEngine, TransformEngine};
use crate::ops::{EngineOptions, OutputFormat, Rotation, TransformOp, WatermarkPosition};
use crate::render::{self, ImageRecord};
use crate::resolve::{RequestUri, UrlResolver};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A failure recorded on a handle. Accumulated, never thrown.
#[derive(Error, Debug)]
pub enum HandleError {
    #[error("Image format not supported: {0} (use: png, gif or jpg)")]
    UnsupportedFormat(String),
    #[error("Could not open the source image: {0}")]
    EngineCreation(EngineError),
    #[error("Engine does not support the {0} operation")]
    UnsupportedOperation(&'static str),
    #[error("Could not create the cache directory. Please check you have write permissions: {path}")]
    CacheDirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Image cache for {name} is not writable. Please check the permissions: {path}")]
    CacheDirectoryUnwritable { name: String, path: PathBuf },
    #[error("Transform replay failed: {0}")]
    Engine(#[from] EngineError),
}

/// Factory tying together configuration, URL resolution and an engine.
///
/// One `Imgtag` serves many handles. Cache layout, URL settings and the
/// request context all live here explicitly; nothing is process-global.
pub struct Imgtag<E = RasterEngine> {
    config: Config,
    resolver: UrlResolver,
    engine: E,
}

impl Imgtag<RasterEngine> {
    /// Build with the production raster engine.
    pub fn new(config: Config, request: RequestUri) -> Result<Self, ConfigError> {
        Self::with_engine(config, request, RasterEngine::new())
    }
}

impl<E: TransformEngine> Imgtag<E> {
    /// Build with a custom engine implementation.
    pub fn with_engine(config: Config, request: RequestUri, engine: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = UrlResolver::new(&config, request);
        Ok(Self {
            config,
            resolver,
            engine,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    /// Open a handle with default options and no extra attributes.
    pub fn image(&self, source: &str, alt: &str) -> ImageHandle<'_, E> {
        self.image_with(source, alt, EngineOptions::default(), Vec::new())
    }

    /// Open a handle with explicit engine options and extra tag attributes.
    pub fn image_with(
        &self,
        source: &str,
        alt: &str,
        options: EngineOptions,
        attributes: Vec<(String, String)>,
    ) -> ImageHandle<'_, E> {
        let source_path = self.resolver.resolve_source_path(source);
        let output_format = OutputFormat::from_path(&source_path);

        let mut handle = ImageHandle {
            engine: &self.engine,
            resolver: &self.resolver,
            config: &self.config,
            resolved_path: source_path.clone(),
            source_path,
            output_format,
            alt: alt.to_string(),
            attributes,
            options,
            history: Vec::new(),
            errors: Vec::new(),
        };

        if handle.output_format.is_none() {
            let ext = handle
                .source_path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            handle.errors.push(HandleError::UnsupportedFormat(ext));
        }
        handle
    }
}

/// One logical image request: source, recorded history, eventual artifact.
pub struct ImageHandle<'a, E: TransformEngine> {
    engine: &'a E,
    resolver: &'a UrlResolver,
    config: &'a Config,
    source_path: PathBuf,
    output_format: Option<OutputFormat>,
    alt: String,
    attributes: Vec<(String, String)>,
    options: EngineOptions,
    history: Vec<TransformOp>,
    resolved_path: PathBuf,
    errors: Vec<HandleError>,
}

impl<'a, E: TransformEngine> ImageHandle<'a, E> {
    /// Append a transform to the history.
    ///
    /// No-op once any error is recorded. The operation is validated against
    /// the engine's vocabulary first; no source I/O happens here.
    pub fn record(&mut self, op: TransformOp) -> &mut Self {
        if !self.errors.is_empty() {
            return self;
        }
        if !self.engine.supports(&op) {
            self.errors.push(HandleError::UnsupportedOperation(op.name()));
            return self;
        }
        self.history.push(op);
        self
    }

    /// Proportional resize fitting inside `width` × `height`.
    pub fn resize(&mut self, width: u32, height: u32) -> &mut Self {
        self.record(TransformOp::Resize { width, height })
    }

    /// Resize to fill the exact dimensions, cropping overflow.
    pub fn adaptive_resize(&mut self, width: u32, height: u32) -> &mut Self {
        self.record(TransformOp::AdaptiveResize { width, height })
    }

    /// Scale both dimensions to a percentage of their current values.
    pub fn resize_percent(&mut self, percent: u32) -> &mut Self {
        self.record(TransformOp::ResizePercent { percent })
    }

    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) -> &mut Self {
        self.record(TransformOp::Crop {
            x,
            y,
            width,
            height,
        })
    }

    pub fn crop_from_center(&mut self, width: u32, height: u32) -> &mut Self {
        self.record(TransformOp::CropFromCenter { width, height })
    }

    pub fn rotate(&mut self, rotation: Rotation) -> &mut Self {
        self.record(TransformOp::Rotate { rotation })
    }

    /// Overlay a mask image at `position`, inset by `padding` pixels.
    pub fn watermark(
        &mut self,
        mask: impl Into<PathBuf>,
        position: WatermarkPosition,
        padding: u32,
    ) -> &mut Self {
        self.record(TransformOp::Watermark {
            mask: mask.into(),
            position,
            padding,
        })
    }

    /// Change the output format. Recorded like any other transform, so a
    /// format change alone still produces a distinct cache entry.
    pub fn set_format(&mut self, format: OutputFormat) -> &mut Self {
        if !self.errors.is_empty() {
            return self;
        }
        self.output_format = Some(format);
        self.record(TransformOp::SetFormat { format })
    }

    /// Change the output format by name. Unknown names record an
    /// [`HandleError::UnsupportedFormat`] and leave the format unchanged.
    pub fn set_format_name(&mut self, name: &str) -> &mut Self {
        if !self.errors.is_empty() {
            return self;
        }
        match OutputFormat::parse(name) {
            Some(format) => self.set_format(format),
            None => {
                self.errors
                    .push(HandleError::UnsupportedFormat(name.to_string()));
                self
            }
        }
    }

    /// Materialize the request and return its presentation record.
    ///
    /// On a degraded handle this returns an empty record; check
    /// [`errors`](Self::errors). Calling twice is cheap — the second call
    /// finds the fresh artifact and binds it directly.
    pub fn materialize(&mut self) -> ImageRecord {
        let bound = self.realize();
        if !self.errors.is_empty() {
            return ImageRecord::default();
        }
        let Some(bound) = bound else {
            return ImageRecord::default();
        };

        let dims = bound.dimensions();
        ImageRecord {
            src: self.resolver.public_url(&self.resolved_path),
            width: dims.map(|d| d.width),
            height: dims.map(|d| d.height),
            alt: self.alt.trim().to_string(),
            attributes: self.attributes.clone(),
        }
    }

    /// Render as an `<img>` tag, or a visible inline error indicator when
    /// the handle is degraded.
    pub fn render_html(&mut self) -> String {
        let record = self.materialize();
        match self.errors.last() {
            Some(error) => render::error_indicator(&error.to_string()).into_string(),
            None => render::image_tag(&record).into_string(),
        }
    }

    /// All recorded errors, oldest first.
    pub fn errors(&self) -> &[HandleError] {
        &self.errors
    }

    /// Recorded error messages, oldest first.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    pub fn last_error(&self) -> Option<&HandleError> {
        self.errors.last()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Path of the materialized artifact. Equals the source path until a
    /// materialization resolves against the cache.
    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    pub fn history(&self) -> &[TransformOp] {
        &self.history
    }

    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    /// Drive the materialization state machine; returns the engine handle
    /// bound to the final artifact (or source, for the no-op path).
    fn realize(&mut self) -> Option<E::Handle> {
        if !self.errors.is_empty() {
            return None;
        }

        // No transforms requested: bind the source directly and skip the
        // cache entirely.
        if self.history.is_empty() {
            let source = self.source_path.clone();
            return self.bind(&source);
        }

        let format = self.output_format?;

        let dir = cache::shard_dir(
            &self.config.cache_root,
            &self.source_path,
            self.config.shard_depth(),
        );
        if let Err(source) = cache::ensure_dir(&dir) {
            self.errors
                .push(HandleError::CacheDirectoryCreate { path: dir, source });
            return None;
        }
        if !cache::probe_writable(&dir) {
            self.errors.push(HandleError::CacheDirectoryUnwritable {
                name: self.source_name(),
                path: dir,
            });
            return None;
        }

        let key = cache::cache_key(&self.source_path, &self.history);
        let dest = dir.join(cache::cache_file_name(&self.source_path, &key, format));

        let bound = if cache::is_fresh(&dest, &self.source_path) {
            self.bind(&dest)?
        } else {
            let source = self.source_path.clone();
            let mut bound = self.bind(&source)?;
            for op in &self.history {
                if let Err(e) = bound.apply(op) {
                    self.errors.push(e.into());
                    return None;
                }
            }
            if let Err(e) = persist_atomic(&bound, &dest, format, &self.source_name()) {
                self.errors.push(e);
                return None;
            }
            bound
        };

        self.resolved_path = dest;
        Some(bound)
    }

    fn bind(&mut self, path: &Path) -> Option<E::Handle> {
        match self.engine.create(EngineSource::Path(path), &self.options) {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.errors.push(HandleError::EngineCreation(e));
                None
            }
        }
    }

    fn source_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Persist through a temp file in the destination directory, then rename
/// into place, so a concurrent reader never observes a partial artifact.
fn persist_atomic<H: EngineHandle>(
    bound: &H,
    dest: &Path,
    format: OutputFormat,
    source_name: &str,
) -> Result<(), HandleError> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".imgtag-write-")
        .tempfile_in(dir)
        .map_err(|_| HandleError::CacheDirectoryUnwritable {
            name: source_name.to_string(),
            path: dir.to_path_buf(),
        })?;

    bound.persist(staging.path(), format)?;

    staging
        .persist(dest)
        .map_err(|_| HandleError::CacheDirectoryUnwritable {
            name: source_name.to_string(),
            path: dir.to_path_buf(),
        })?;
    Ok(())
}
