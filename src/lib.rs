//! # imgtag
//!
//! A thin convenience layer over raster image processing: resolve a source
//! image from a URL or path reference, record a chain of transforms without
//! executing them, materialize the result through a content-addressed on-disk
//! cache, and render an HTML `<img>` tag (or a structured record) for it.
//!
//! ```no_run
//! use imgtag::{Config, Imgtag, RequestUri};
//!
//! # fn main() -> Result<(), imgtag::ConfigError> {
//! let app = Imgtag::new(
//!     Config::default(),
//!     RequestUri::parse("https://example.net/gallery/index.html"),
//! )?;
//!
//! let mut img = app.image("/img/waterfall.jpg", "Waterfall");
//! img.adaptive_resize(200, 400);
//! println!("{}", img.render_html());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture: Record, Then Materialize
//!
//! Transform calls never touch pixels. Each call appends a typed
//! [`TransformOp`] to the handle's history; only
//! [`materialize`](handle::ImageHandle::materialize) (or
//! [`render_html`](handle::ImageHandle::render_html), which calls it) does
//! I/O. Deferring execution is what makes the cache worthwhile — on a hit
//! the whole decode/transform/encode pipeline is skipped and the previously
//! persisted artifact is bound directly.
//!
//! ```text
//! image(...)  →  resize(..) → watermark(..)   →   materialize()
//!                 (recorded, no I/O)               │
//!                                      ┌───────────┴───────────┐
//!                                    cache hit             cache miss
//!                                  bind artifact     replay history, persist
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`handle`] | Per-request [`ImageHandle`](handle::ImageHandle): recording, sticky errors, materialization |
//! | [`cache`] | Content-addressed cache: keys, sharded layout, staleness, writability probing |
//! | [`engine`] | The engine seam ([`TransformEngine`](engine::TransformEngine)) and the `image`-crate-backed [`RasterEngine`](engine::RasterEngine) |
//! | [`ops`] | Closed transform vocabulary, output formats, engine options |
//! | [`resolve`] | Request-URI parsing, source-reference and public-URL resolution |
//! | [`render`] | [`ImageRecord`](render::ImageRecord) and maud-based HTML rendering |
//! | [`config`] | Explicit [`Config`](config::Config): cache layout and URL settings, TOML-loadable |
//!
//! # Design Decisions
//!
//! ## A Closed Transform Vocabulary
//!
//! Operations are a tagged enum with typed arguments rather than free-form
//! (name, arguments) pairs. Validation is membership in the vocabulary plus
//! a `supports` check against the engine — no reflective probing, and the
//! history serializes deterministically for cache keying.
//!
//! ## Errors Accumulate, Nothing Throws
//!
//! A handle's public surface never returns `Result`. Failures append to an
//! ordered error list; the first one turns all further recording and
//! materialization into no-ops, and rendering degrades to a visible inline
//! indicator. The worst failure mode is a degraded render, never a crash.
//!
//! ## Explicit Configuration
//!
//! Cache root, shard depth, URL mode and CDN prefix travel in one [`Config`]
//! value handed to [`Imgtag`] at construction, alongside a [`RequestUri`]
//! parsed once per request. Nothing is process-global.
//!
//! ## Single-Threaded, Synchronous I/O
//!
//! Every filesystem check is a blocking call, and there is no cross-process
//! locking. Two writers racing on one cache key both produce the same bytes;
//! persists go through a temp file and an atomic rename so readers never see
//! a partial artifact.

pub mod cache;
pub mod config;
pub mod engine;
pub mod handle;
pub mod ops;
pub mod render;
pub mod resolve;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{Config, ConfigError, UrlMode};
pub use engine::{Dimensions, EngineError, EngineHandle, EngineSource, RasterEngine, TransformEngine};
pub use handle::{HandleError, ImageHandle, Imgtag};
pub use ops::{EngineOptions, OutputFormat, Quality, Rotation, TransformOp, WatermarkPosition};
pub use render::ImageRecord;
pub use resolve::{RequestUri, UrlResolver};
