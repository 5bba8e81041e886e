//! Content-addressed artifact cache with lazy invalidation.
//!
//! Materializing an image replays its whole recorded transform history
//! through the engine — decode, N pixel operations, encode. This module lets
//! that entire pipeline short-circuit when an identical request has already
//! been materialized and the source file has not changed since.
//!
//! # Design
//!
//! The cache is **content-addressed by request**: the key is a hash of the
//! source path plus the serialized, ordered transform history. There is no
//! manifest and no in-memory index — presence of the keyed file on disk *is*
//! the cache entry, so independent processes share the cache for free.
//!
//! ## Cache keys
//!
//! - **Source hash**: SHA-256 of the source path string. It addresses the
//!   *identity* of the input, not its bytes; freshness is a separate mtime
//!   check so that touching a source invalidates without rehashing content.
//!
//! - **Cache key**: SHA-256 of `source path ++ NUL ++ JSON(history)`. Any
//!   difference in operation, argument, or call order yields a different key;
//!   identical requests collide deliberately. Order is never normalized, so
//!   semantically commutative sequences cache as distinct entries.
//!
//! ## Layout
//!
//! Entries are sharded below the cache root by successive prefixes of the
//! source hash, one more character per level, to bound per-directory file
//! counts:
//!
//! ```text
//! <cache_root>/a/ab/photo.<cache_key>.jpg        (depth 2)
//! ```
//!
//! All requests for one source land in one shard directory; only the
//! filename varies with the transform history.
//!
//! ## Staleness
//!
//! An entry is valid while its modification time is at or after the source
//! file's. A newer source forces regeneration; the stale file is simply
//! overwritten. There is no eviction — operators prune the cache root
//! out-of-band.

use crate::config::Config;
use crate::ops::{OutputFormat, TransformOp};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Fallback filename stem for sources without one.
const DEFAULT_STEM: &str = "image";

/// SHA-256 of the source path string, as lowercase hex.
pub fn source_hash(source: &Path) -> String {
    let digest = Sha256::digest(source.display().to_string().as_bytes());
    format!("{:x}", digest)
}

/// Deterministic cache key for a (source, history) pair.
///
/// The history is serialized in recorded order; the NUL separator keeps the
/// path and history contributions unambiguous.
pub fn cache_key(source: &Path, history: &[TransformOp]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.display().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(serialize_history(history));
    format!("{:x}", hasher.finalize())
}

/// Serialize the ordered history for hashing.
///
/// JSON over a closed enum has a stable field order. The only way it can
/// fail is a non-UTF-8 watermark mask path; `Debug` formatting is an equally
/// deterministic stand-in for that case.
fn serialize_history(history: &[TransformOp]) -> Vec<u8> {
    serde_json::to_vec(history).unwrap_or_else(|_| format!("{history:?}").into_bytes())
}

/// Shard directory for a source: `depth` levels of growing hash prefixes.
pub fn shard_dir(cache_root: &Path, source: &Path, depth: u32) -> PathBuf {
    let hash = source_hash(source);
    let mut dir = cache_root.to_path_buf();
    for level in 1..=depth as usize {
        dir.push(&hash[..level]);
    }
    dir
}

/// Cache filename: `{stem}.{cache_key}.{format}`.
///
/// The stem is kept purely so operators can recognize entries when poking
/// around the cache tree; uniqueness comes from the key.
pub fn cache_file_name(source: &Path, key: &str, format: OutputFormat) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_STEM);
    format!("{}.{}.{}", stem, key, format.extension())
}

/// Full cache path for a request, combining shard directory and filename.
pub fn cache_path(
    config: &Config,
    source: &Path,
    history: &[TransformOp],
    format: OutputFormat,
) -> PathBuf {
    let key = cache_key(source, history);
    shard_dir(&config.cache_root, source, config.shard_depth())
        .join(cache_file_name(source, &key, format))
}

/// Whether a cache file exists and is at least as new as its source.
///
/// When either modification time cannot be read, an existing entry is
/// trusted; only a provably newer source forces regeneration.
pub fn is_fresh(cache_file: &Path, source: &Path) -> bool {
    if !cache_file.is_file() {
        return false;
    }
    let (Ok(cache_mtime), Ok(source_mtime)) = (mtime(cache_file), mtime(source)) else {
        return true;
    };
    source_mtime <= cache_mtime
}

fn mtime(path: &Path) -> io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

/// Create the shard directory, parents included.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Probe a directory with a uniquely named throwaway file.
///
/// Catches read-only mounts and permission problems before the engine does
/// any pixel work. The probe file is removed on drop.
pub fn probe_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".imgtag-probe-")
        .tempfile_in(dir)
        .is_ok()
}
