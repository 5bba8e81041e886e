//! Transform engine traits and shared types.
//!
//! The engine is the seam between recorded intent and pixel work.
//! [`TransformEngine`] binds a source (file or in-memory bytes) into an
//! [`EngineHandle`]; the handle replays [`TransformOp`]s, reports dimensions,
//! and persists the result.
//!
//! The production implementation is
//! [`RasterEngine`](super::raster::RasterEngine), built on the `image` crate.
//! Tests use the recording `MockEngine` from this file's test module, which
//! never touches pixels.

use crate::ops::{EngineOptions, OutputFormat, TransformOp};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: String, reason: String },
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Pixel dimensions of a bound image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Where a handle's pixels come from.
#[derive(Debug, Clone, Copy)]
pub enum EngineSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// Factory half of the engine seam.
///
/// `supports` answers whether an operation can be replayed at all, without
/// binding the source image — recording must stay free of source I/O.
pub trait TransformEngine {
    type Handle: EngineHandle;

    /// Bind a source into a handle. Fails on unreadable or undecodable input.
    fn create(
        &self,
        source: EngineSource<'_>,
        options: &EngineOptions,
    ) -> Result<Self::Handle, EngineError>;

    /// Whether this engine can replay the given operation.
    fn supports(&self, op: &TransformOp) -> bool;
}

/// A source bound by the engine, ready for replay and persistence.
pub trait EngineHandle {
    /// Replay one recorded transform against the bound pixels.
    fn apply(&mut self, op: &TransformOp) -> Result<(), EngineError>;

    /// Write the current pixels to `dest` in the given format.
    fn persist(&self, dest: &Path, format: OutputFormat) -> Result<(), EngineError>;

    /// Current dimensions, when the engine can report them.
    fn dimensions(&self) -> Option<Dimensions>;
}
