//! Static file serving.
//!
//! [`StaticFiles`] maps a URL remainder onto a directory without ever leaving
//! it: only normal path components are accepted, so `..`, absolute paths and
//! drive prefixes are refused. [`StaticOptions`] resolves MIME types from a
//! builtin extension table plus caller overrides and controls `Cache-Control`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::server::Response;

const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);
const FALLBACK_MIME: &str = "application/octet-stream";

/// Builtin extension → MIME table. Extensions are matched lowercase.
pub fn builtin_mime(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "json" => "application/json",
        "doc" | "docx" => "application/msword",
        "pdf" | "ai" => "application/pdf",
        "xml" | "xsl" | "xlsx" => "application/xml",
        "zip" => "application/zip",
        "wasm" => "application/wasm",
        "m4a" | "mp4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "oga" | "ogg" | "opus" => "audio/ogg",
        "weba" => "audio/webm",
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "tiff" | "tif" => "image/tiff",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "ics" | "ifb" => "text/calendar",
        "css" => "text/css",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "js" | "mjs" => "text/javascript",
        "txt" | "text" | "conf" | "log" | "ini" => "text/plain",
        "rtf" => "text/richtext",
        "mp4" | "mp4v" | "mpg4" | "mpeg" | "ts" => "video/mpeg",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}

/// Options for [`Response::send_file`] and `Router::serve_static`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOptions {
    /// Value of `Cache-Control: max-age`, sent in whole seconds
    pub max_age: Duration,
    /// Extension → MIME overrides, consulted before the builtin table
    pub mime_types: HashMap<String, String>,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            mime_types: HashMap::new(),
        }
    }
}

impl StaticOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_age_minutes(mut self, minutes: u64) -> Self {
        self.max_age = Duration::from_secs(minutes.saturating_mul(60));
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, ext: &str, mime: &str) -> Self {
        self.mime_types.insert(
            ext.trim_start_matches('.').to_ascii_lowercase(),
            mime.to_string(),
        );
        self
    }

    /// MIME type for `path`: caller override, then builtin table, then
    /// `application/octet-stream`.
    #[must_use]
    pub fn mime_for(&self, path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if let Some(mime) = self.mime_types.get(&ext) {
            return mime.clone();
        }
        builtin_mime(&ext).unwrap_or(FALLBACK_MIME).to_string()
    }

    #[must_use]
    pub fn cache_control(&self) -> String {
        format!("max-age={}", self.max_age.as_secs())
    }
}

/// A directory served under a URL prefix.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
    options: StaticOptions,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P, options: StaticOptions) -> Self {
        Self {
            base_dir: base.into(),
            options,
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Answer a request for `rest` (the URL remainder below the mount point).
    ///
    /// Extension-less paths are treated as client-side routes and get the
    /// directory's `index.html` when one exists. Anything else that does not
    /// resolve to a file inside the directory ends with 404.
    pub fn respond(&self, rest: &str, res: &mut Response) -> Result<()> {
        let index = self.base_dir.join("index.html");
        if Path::new(rest).extension().is_none() && index.is_file() {
            debug!(rest = %rest, file = %index.display(), "Serving index for extension-less path");
            return res.send_file(&index, &self.options);
        }
        match self.map_path(rest) {
            Some(file) => {
                debug!(rest = %rest, file = %file.display(), "Serving static file");
                res.send_file(&file, &self.options)
            }
            None => {
                debug!(rest = %rest, "Rejected static path outside base directory");
                res.end(404);
                Ok(())
            }
        }
    }
}
