//! Response writer.
//!
//! Handlers write into a [`Response`] and finish it with one of the terminal
//! helpers (`send*`, `end`, `redirect`). A finalised response is frozen:
//! later writes are ignored and logged, and the dispatcher stops running the
//! rest of the handler chain.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use super::request::HeaderVec;
use crate::static_files::StaticOptions;

/// Canonical reason phrase for a status code.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An outgoing response under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: HeaderVec,
    body: Vec<u8>,
    finalized: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Vec::new(),
            finalized: false,
        }
    }

    /// A finalised `404 Not Found` response.
    #[must_use]
    pub fn not_found() -> Self {
        let mut res = Self::new();
        res.status(404)
            .set_header("content-type", "text/plain; charset=utf-8");
        res.send(status_reason(404));
        res
    }

    /// A finalised `500 Internal Server Error` response carrying `detail`.
    #[must_use]
    pub fn internal_error(detail: &str) -> Self {
        let mut res = Self::new();
        res.status(500)
            .set_header("content-type", "text/plain; charset=utf-8");
        res.send(format!("{}: {detail}", status_reason(500)));
        res
    }

    /// Carry over headers from `earlier` that this response does not set
    /// itself. Body-describing headers are left behind.
    #[must_use]
    pub fn with_headers_from(mut self, earlier: &Response) -> Self {
        for (name, value) in &earlier.headers {
            if matches!(&**name, "content-type" | "content-length") {
                continue;
            }
            if self.header(name).is_none() {
                self.headers.push((Arc::clone(name), value.clone()));
            }
        }
        self
    }

    fn writable(&self, op: &str) -> bool {
        if self.finalized {
            warn!(op = op, status = self.status, "Write after response was finalized ignored");
            return false;
        }
        true
    }

    /// Set the status code (chainable).
    pub fn status(&mut self, code: u16) -> &mut Self {
        if self.writable("status") {
            self.status = code;
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Set a header, replacing any existing value (names are case-insensitive).
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.writable("set_header") {
            self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            self.headers
                .push((Arc::from(name.to_ascii_lowercase()), value.to_string()));
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        if self.writable("remove_header") {
            self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Append raw bytes to the body without finalising.
    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        if self.writable("write") {
            self.body.extend_from_slice(bytes);
        }
        self
    }

    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write(s.as_bytes())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Mark the response complete. Idempotent.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    #[inline]
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Append `data` to the body and finalise.
    pub fn send<B: AsRef<[u8]>>(&mut self, data: B) {
        if self.writable("send") {
            self.body.extend_from_slice(data.as_ref());
            self.finalized = true;
        }
    }

    /// Send `data`, optionally declaring its content type, and finalise.
    pub fn send_data<B: AsRef<[u8]>>(&mut self, data: B, content_type: Option<&str>) {
        if let Some(ct) = content_type {
            self.set_header("content-type", ct);
        }
        self.send(data);
    }

    /// Serialise `value` as JSON and finalise.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).context("Failed to encode JSON response")?;
        self.send_data(bytes, Some("application/json"));
        Ok(())
    }

    /// `302 Found` (or `301 Moved Permanently`) to `uri`, finalised.
    pub fn redirect(&mut self, uri: &str, permanent: bool) {
        self.status(if permanent { 301 } else { 302 })
            .set_header("location", uri);
        self.finalize();
    }

    /// Set `code` and finalise with whatever body has been written so far.
    pub fn end(&mut self, code: u16) {
        self.status(code);
        self.finalize();
    }

    /// Send the file at `path` with a MIME type and cache headers derived
    /// from `options`. A missing file ends the response with 404.
    pub fn send_file<P: AsRef<Path>>(&mut self, path: P, options: &StaticOptions) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            self.end(404);
            return Ok(());
        }
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read static file {}", path.display()))?;
        let mime = options.mime_for(path);
        self.remove_header("expires")
            .remove_header("pragma")
            .set_header("cache-control", &options.cache_control())
            .set_header("content-type", &mime);
        self.send(bytes);
        Ok(())
    }

    /// Convert into a standard `http` response.
    pub fn into_http(self) -> std::result::Result<http::Response<Vec<u8>>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(&**name, value.as_str());
        }
        builder.body(self.body)
    }
}
