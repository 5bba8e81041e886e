//! Source-reference and public-URL resolution.
//!
//! Callers hand in image references the way they appear in markup — absolute
//! filesystem paths, server-relative URLs, or full URLs on the serving host.
//! [`UrlResolver::resolve_source_path`] turns any internal reference into an
//! absolute filesystem path, and [`UrlResolver::public_url`] maps a
//! materialized file back into a URL per the configured [`UrlMode`].
//!
//! The request URI is parsed once into a [`RequestUri`] value and passed in
//! explicitly; the resolver holds no global or lazily initialized state.

use crate::config::{Config, UrlMode};
use std::path::{Path, PathBuf};

/// A parsed request URI: scheme, host, port and path.
///
/// Parsing is tolerant — partial URIs (`//host/x`, `/gallery/index.html`)
/// populate whatever components they carry and leave the rest empty. Query
/// string and fragment are discarded; they never affect path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUri {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

impl RequestUri {
    pub fn parse(uri: &str) -> Self {
        let uri = uri.trim();
        // Query and fragment play no part in path resolution
        let uri = uri.split(['?', '#']).next().unwrap_or("");

        let (scheme, rest) = match uri.split_once("://") {
            Some((s, r)) => (s.to_string(), r),
            None => match uri.strip_prefix("//") {
                Some(r) => (String::new(), r),
                None => {
                    return Self {
                        scheme: String::new(),
                        host: String::new(),
                        port: None,
                        path: uri.to_string(),
                    };
                }
            },
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, String::new()),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h.to_string(), p.parse().ok()),
            None => (authority.to_string(), None),
        };

        Self {
            scheme,
            host,
            port,
            path,
        }
    }

    /// `scheme://host[:port]`, or empty when the URI carried no host.
    pub fn origin(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }
        let scheme = if self.scheme.is_empty() {
            String::new()
        } else {
            format!("{}:", self.scheme)
        };
        match self.port {
            Some(port) => format!("{}//{}:{}", scheme, self.host, port),
            None => format!("{}//{}", scheme, self.host),
        }
    }

    /// Directory portion of the request path, without a trailing slash
    /// (`/gallery` for `/gallery/index.html`, empty for `/index.html`).
    pub fn base_dir(&self) -> String {
        match self.path.rfind('/') {
            Some(0) | None => String::new(),
            Some(idx) => self.path[..idx].to_string(),
        }
    }
}

/// Maps source references to filesystem paths and cache paths to URLs.
pub struct UrlResolver {
    request: RequestUri,
    root_path: PathBuf,
    url_mode: UrlMode,
    protocol_less: bool,
    cdn_prefix: Option<String>,
}

impl UrlResolver {
    pub fn new(config: &Config, request: RequestUri) -> Self {
        Self {
            request,
            root_path: config.root_path.clone(),
            url_mode: config.url_mode,
            protocol_less: config.protocol_less,
            cdn_prefix: config.cdn_prefix(),
        }
    }

    /// A reference is internal when it names no host or names the serving
    /// host. External references are never resolved to local files.
    fn is_internal(&self, parsed: &RequestUri) -> bool {
        parsed.host.is_empty() || parsed.host == self.request.host
    }

    /// Resolve an image reference to an absolute filesystem path.
    ///
    /// References that already name an existing file pass through unchanged.
    /// Internal URL references are stripped of their origin and joined onto
    /// the configured root path; when no file exists there either, the
    /// cleaned path is returned as-is and the engine reports the failure at
    /// bind time. External references are never treated as local files.
    pub fn resolve_source_path(&self, reference: &str) -> PathBuf {
        let reference = reference.trim();
        if reference.is_empty() {
            return PathBuf::new();
        }

        let parsed = RequestUri::parse(reference);
        if !self.is_internal(&parsed) {
            return PathBuf::from(reference);
        }

        // For internal references, the URL path with the origin stripped is
        // the filesystem-relevant part
        let local = if parsed.host.is_empty() {
            clean_path(reference)
        } else {
            clean_path(&parsed.path)
        };
        let direct = PathBuf::from(&local);
        if direct.is_file() {
            return direct;
        }

        if !self.root_path.as_os_str().is_empty() {
            let candidate = self.root_path.join(local.trim_start_matches('/'));
            if candidate.is_file() {
                return candidate;
            }
        }

        direct
    }

    /// Map an absolute filesystem path to a public URL.
    ///
    /// Paths under the root path are rewritten relative to it and prefixed
    /// with the CDN URL (when configured) or the mode-selected base. Paths
    /// outside the root, or any path when no root is configured, are emitted
    /// verbatim.
    pub fn public_url(&self, path: &Path) -> String {
        if self.root_path.as_os_str().is_empty() {
            return path.display().to_string();
        }
        let rel = match path.strip_prefix(&self.root_path) {
            Ok(rel) => rel,
            Err(_) => return path.display().to_string(),
        };
        let rel = clean_path(&rel.display().to_string());
        let rel = rel.trim_start_matches('/');

        if let Some(cdn) = &self.cdn_prefix {
            return format!("{}{}", cdn, rel);
        }

        match self.url_mode {
            UrlMode::Absolute => {
                let mut origin = self.request.origin();
                if self.protocol_less
                    && let Some(idx) = origin.find("//")
                {
                    origin = origin[idx..].to_string();
                }
                format!("{}/{}", origin, rel)
            }
            UrlMode::Root => format!("/{}", rel),
            UrlMode::Base => format!("{}/{}", self.request.base_dir(), rel),
        }
    }
}

/// Collapse repeated separators and normalize to forward slashes.
fn clean_path(path: &str) -> String {
    let path = path.trim();
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for (i, c) in path.chars().enumerate() {
        let is_sep = c == '/' || c == '\\';
        // Keep "//" only as a leading protocol-relative marker
        if is_sep && prev_sep && i != 1 {
            continue;
        }
        out.push(if is_sep { '/' } else { c });
        prev_sep = is_sep;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn request() -> RequestUri {
        RequestUri::parse("https://photos.example.net/gallery/index.html")
    }

    fn resolver_with(config: Config) -> UrlResolver {
        UrlResolver::new(&config, request())
    }

    #[test]
    fn parse_full_uri() {
        let uri = request();
        assert_eq!(uri.scheme, "https");
        assert_eq!(uri.host, "photos.example.net");
        assert_eq!(uri.port, None);
        assert_eq!(uri.path, "/gallery/index.html");
        assert_eq!(uri.origin(), "https://photos.example.net");
        assert_eq!(uri.base_dir(), "/gallery");
    }

    #[test]
    fn parse_with_port_query_and_fragment() {
        let uri = RequestUri::parse("http://localhost:8080/a/b?x=1#top");
        assert_eq!(uri.host, "localhost");
        assert_eq!(uri.port, Some(8080));
        assert_eq!(uri.path, "/a/b");
        assert_eq!(uri.origin(), "http://localhost:8080");
    }

    #[test]
    fn parse_protocol_relative_and_bare_path() {
        let uri = RequestUri::parse("//cdn.example.net/x.jpg");
        assert_eq!(uri.scheme, "");
        assert_eq!(uri.host, "cdn.example.net");
        assert_eq!(uri.path, "/x.jpg");

        let uri = RequestUri::parse("/img/photo.jpg");
        assert_eq!(uri.host, "");
        assert_eq!(uri.path, "/img/photo.jpg");
    }

    #[test]
    fn base_dir_of_root_level_request() {
        assert_eq!(RequestUri::parse("http://h/index.html").base_dir(), "");
    }

    #[test]
    fn resolve_existing_absolute_path_passes_through() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("photo.jpg");
        fs::write(&file, "x").unwrap();

        let resolver = resolver_with(Config::default());
        assert_eq!(resolver.resolve_source_path(file.to_str().unwrap()), file);
    }

    #[test]
    fn resolve_internal_url_joins_root_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("img")).unwrap();
        let file = tmp.path().join("img/photo.jpg");
        fs::write(&file, "x").unwrap();

        let mut config = Config::default();
        config.root_path = tmp.path().to_path_buf();
        let resolver = resolver_with(config);

        assert_eq!(resolver.resolve_source_path("/img/photo.jpg"), file);
        assert_eq!(
            resolver.resolve_source_path("https://photos.example.net/img/photo.jpg"),
            file
        );
    }

    #[test]
    fn resolve_external_host_is_left_alone() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.root_path = tmp.path().to_path_buf();
        let resolver = resolver_with(config);

        let reference = "https://elsewhere.example.org/img/photo.jpg";
        assert_eq!(
            resolver.resolve_source_path(reference),
            PathBuf::from(reference)
        );
    }

    #[test]
    fn resolve_missing_file_returns_cleaned_reference() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.root_path = tmp.path().to_path_buf();
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.resolve_source_path("/img//nothere.jpg"),
            PathBuf::from("/img/nothere.jpg")
        );
    }

    #[test]
    fn public_url_base_mode() {
        let mut config = Config::default();
        config.root_path = PathBuf::from("/srv/site");
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.public_url(Path::new("/srv/site/cache/a/ab/photo.x.jpg")),
            "/gallery/cache/a/ab/photo.x.jpg"
        );
    }

    #[test]
    fn public_url_root_mode() {
        let mut config = Config::default();
        config.root_path = PathBuf::from("/srv/site");
        config.url_mode = UrlMode::Root;
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.public_url(Path::new("/srv/site/cache/photo.jpg")),
            "/cache/photo.jpg"
        );
    }

    #[test]
    fn public_url_absolute_mode_protocol_less() {
        let mut config = Config::default();
        config.root_path = PathBuf::from("/srv/site");
        config.url_mode = UrlMode::Absolute;
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.public_url(Path::new("/srv/site/cache/photo.jpg")),
            "//photos.example.net/cache/photo.jpg"
        );
    }

    #[test]
    fn public_url_absolute_mode_with_scheme() {
        let mut config = Config::default();
        config.root_path = PathBuf::from("/srv/site");
        config.url_mode = UrlMode::Absolute;
        config.protocol_less = false;
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.public_url(Path::new("/srv/site/cache/photo.jpg")),
            "https://photos.example.net/cache/photo.jpg"
        );
    }

    #[test]
    fn public_url_cdn_overrides_mode() {
        let mut config = Config::default();
        config.root_path = PathBuf::from("/srv/site");
        config.url_mode = UrlMode::Absolute;
        config.cdn_url = "https://static.example.net".into();
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.public_url(Path::new("/srv/site/cache/photo.jpg")),
            "https://static.example.net/cache/photo.jpg"
        );
    }

    #[test]
    fn public_url_outside_root_passes_through() {
        let mut config = Config::default();
        config.root_path = PathBuf::from("/srv/site");
        let resolver = resolver_with(config);

        assert_eq!(
            resolver.public_url(Path::new("/mnt/other/photo.jpg")),
            "/mnt/other/photo.jpg"
        );
    }

    #[test]
    fn clean_path_collapses_separators() {
        assert_eq!(clean_path("/a//b\\\\c/"), "/a/b/c/");
        assert_eq!(clean_path("//host/x"), "//host/x");
        assert_eq!(clean_path("  /a/b "), "/a/b");
    }
}
