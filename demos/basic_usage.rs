//! Basic walkthrough: configure, record transforms, render.
//!
//! Builds a small site layout in a temp directory, materializes one image
//! through the cache, and prints the structured record and the HTML tag.
//!
//! ```sh
//! cargo run --example basic_usage
//! ```

use imgtag::{Config, Imgtag, RequestUri, UrlMode};
use image::RgbImage;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempfile::TempDir::new()?;
    std::fs::create_dir_all(root.path().join("images"))?;

    // A stand-in source photo
    let source = root.path().join("images/waterfall.jpg");
    RgbImage::from_fn(800, 600, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 160])
    })
    .save(&source)?;

    let mut config = Config::default();
    config.cache_root = root.path().join("cache");
    config.root_path = root.path().to_path_buf();
    config.url_mode = UrlMode::Absolute;
    // config.cdn_url = "//static.example.net/imgtag".into();

    let app = Imgtag::new(
        config,
        RequestUri::parse("https://example.net/gallery/index.html"),
    )?;

    let mut img = app.image(source.to_str().unwrap(), "Waterfall");
    img.adaptive_resize(200, 400);

    let record = img.materialize();
    println!("{}", serde_json::to_string_pretty(&record)?);
    println!("{}", img.render_html());

    // Materializing again hits the cache - same artifact, no re-encode
    let again = img.materialize();
    assert_eq!(again.src, record.src);
    println!("cached at: {}", img.resolved_path().display());

    Ok(())
}
