//! Shared test utilities.
//!
//! Provides synthetic image writers and a preconfigured [`TestSite`] — a
//! temp directory wired up as content root and cache root, with a fixed
//! request URI — so handle and cache tests don't repeat setup.

use crate::config::{Config, UrlMode};
use crate::resolve::RequestUri;
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a small valid JPEG with a deterministic gradient.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid PNG with an alpha gradient.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    img.save(path).unwrap();
}

/// A temp directory laid out as a served site: `img/` for sources and
/// `cache/` as the cache root, with root-relative URL generation.
pub struct TestSite {
    pub tmp: TempDir,
    pub config: Config,
}

impl TestSite {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("img")).unwrap();

        let mut config = Config::default();
        config.cache_root = tmp.path().join("cache");
        config.root_path = tmp.path().to_path_buf();
        config.url_mode = UrlMode::Root;

        Self { tmp, config }
    }

    pub fn request() -> RequestUri {
        RequestUri::parse("https://photos.example.net/gallery/index.html")
    }

    /// Create a source JPEG under `img/` and return its absolute path.
    pub fn source_jpeg(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.tmp.path().join("img").join(name);
        create_test_jpeg(&path, width, height);
        path
    }
}
