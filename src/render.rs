//! Presentation records and HTML rendering.
//!
//! A materialized handle yields an [`ImageRecord`] — everything a template
//! needs to embed the image. [`image_tag`] renders it as an `<img>` element;
//! [`error_indicator`] is the degraded rendering used when a handle carries
//! errors, a visible inline marker instead of a broken image.
//!
//! Rendering uses [maud](https://maud.lambda.xyz/): interpolated values are
//! auto-escaped. Extra attributes have caller-supplied *names*, which maud's
//! macro cannot express, so the tag for those is assembled manually with
//! [`maud::Escaper`] on every value and a whitelist check on every name.

use maud::{Escaper, Markup, PreEscaped, html};
use serde::Serialize;
use std::fmt::Write;

/// The structured result of materializing a handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageRecord {
    /// Public URL of the materialized image.
    pub src: String,
    /// Pixel width, when the engine reported dimensions.
    pub width: Option<u32>,
    /// Pixel height, when the engine reported dimensions.
    pub height: Option<u32>,
    /// Alternative text.
    pub alt: String,
    /// Additional attributes rendered onto the tag, in insertion order.
    pub attributes: Vec<(String, String)>,
}

/// Render an `<img>` tag for a record.
///
/// Attributes with names that are not valid HTML attribute names are
/// dropped; values are always escaped.
pub fn image_tag(record: &ImageRecord) -> Markup {
    let mut tag = String::from("<img");
    push_attr(&mut tag, "src", &record.src);
    if let Some(width) = record.width {
        let _ = write!(tag, " width=\"{width}\"");
    }
    if let Some(height) = record.height {
        let _ = write!(tag, " height=\"{height}\"");
    }
    push_attr(&mut tag, "alt", &record.alt);
    for (name, value) in &record.attributes {
        if is_valid_attr_name(name) {
            push_attr(&mut tag, name, value);
        }
    }
    tag.push_str(" />");
    PreEscaped(tag)
}

/// Render the most recent error as a visible inline indicator.
pub fn error_indicator(message: &str) -> Markup {
    html! {
        span style="background:#000;color:#f00;" { (message) }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    let _ = Escaper::new(out).write_str(value);
    out.push('"');
}

fn is_valid_attr_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}
