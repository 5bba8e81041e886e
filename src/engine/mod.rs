//! The transform engine seam.
//!
//! The module is split into:
//! - **Backend**: [`TransformEngine`] / [`EngineHandle`] traits and shared types
//! - **Raster**: [`RasterEngine`], the production implementation on the `image` crate

pub mod backend;
pub mod raster;

pub use backend::{Dimensions, EngineError, EngineHandle, EngineSource, TransformEngine};
pub use raster::RasterEngine;
