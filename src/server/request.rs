//! Request accessor.
//!
//! A [`Request`] is a plain value the host builds from whatever transport it
//! runs on (or from a standard [`http::Request`] via [`Request::from_http`]).
//! The router never reads ambient process state; everything a handler can
//! see about the incoming request lives here.

use std::path::PathBuf;
use std::sync::Arc;

use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::RequestError;
use crate::router::pattern::{normalize_path, ParamVec};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage with lowercase `Arc<str>` names
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Failure code attached to an uploaded file by the host's multipart parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadError {
    /// File exceeds the server-side size limit
    IniSize,
    /// File exceeds the size limit declared by the form
    FormSize,
    /// File was only partially received
    Partial,
    /// No file was sent for the field
    NoFile,
    /// Server has no temporary directory
    NoTmpDir,
    /// Temporary file could not be written
    CantWrite,
    /// An extension stopped the upload
    Extension,
    /// Unrecognised non-zero code
    Unknown,
}

impl UploadError {
    /// Map a conventional numeric upload status (0 = ok) to an error.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(UploadError::IniSize),
            2 => Some(UploadError::FormSize),
            3 => Some(UploadError::Partial),
            4 => Some(UploadError::NoFile),
            6 => Some(UploadError::NoTmpDir),
            7 => Some(UploadError::CantWrite),
            8 => Some(UploadError::Extension),
            _ => Some(UploadError::Unknown),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UploadError::IniSize => "UPLOAD_ERR_INI_SIZE",
            UploadError::FormSize => "UPLOAD_ERR_FORM_SIZE",
            UploadError::Partial => "UPLOAD_ERR_PARTIAL",
            UploadError::NoFile => "UPLOAD_ERR_NO_FILE",
            UploadError::NoTmpDir => "UPLOAD_ERR_NO_TMP_DIR",
            UploadError::CantWrite => "UPLOAD_ERR_CANT_WRITE",
            UploadError::Extension => "UPLOAD_ERR_EXTENSION",
            UploadError::Unknown => "UNKNOWN_ERR",
        }
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one uploaded file, as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Original client-side file name
    pub name: String,
    /// Where the host spooled the bytes
    pub temp_path: PathBuf,
    /// MIME type declared by the client
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// `None` when the upload succeeded
    pub error: Option<UploadError>,
}

/// Request body decoded according to its `Content-Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded` or `multipart/form-data` fields
    Form(ParamVec),
    /// Anything else, untouched
    Raw(Vec<u8>),
}

/// An incoming request as seen by handlers.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    path: String,
    headers: HeaderVec,
    query: ParamVec,
    body: Vec<u8>,
    form: ParamVec,
    files: Vec<(Arc<str>, Vec<UploadedFile>)>,
}

impl Request {
    /// Build a request from a method and a raw request URI (path plus
    /// optional query string).
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let query = match uri.split_once('?') {
            Some((_, q)) => parse_query_params(q.split('#').next().unwrap_or_default()),
            None => ParamVec::new(),
        };
        Self {
            method,
            uri: uri.to_string(),
            path: normalize_path(uri),
            headers: HeaderVec::new(),
            query,
            body: Vec::new(),
            form: ParamVec::new(),
            files: Vec::new(),
        }
    }

    /// Like [`Request::new`] but from a method token. Tokens are
    /// case-sensitive: `get` is an extension method, not `GET`.
    pub fn parse(method: &str, uri: &str) -> Result<Self, RequestError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| RequestError::InvalidMethod(method.to_string()))?;
        Ok(Self::new(method, uri))
    }

    /// Adapt a standard `http` request. Header values that are not valid
    /// UTF-8 are converted lossily.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let mut request = Self::new(parts.method, &uri);
        for (name, value) in &parts.headers {
            request.push_header(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
        }
        request.body = body;
        debug!(
            method = %request.method,
            path = %request.path,
            header_count = request.headers.len(),
            body_size_bytes = request.body.len(),
            "HTTP request adapted"
        );
        request
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.push_header(name, value);
        self
    }

    #[must_use]
    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Add a decoded multipart form field (multipart parsing is the host's job).
    #[must_use]
    pub fn with_form_field(mut self, name: &str, value: &str) -> Self {
        self.form.push((Arc::from(name), value.to_string()));
        self
    }

    /// Attach an uploaded file under form field `field`.
    #[must_use]
    pub fn with_file(mut self, field: &str, file: UploadedFile) -> Self {
        match self.files.iter_mut().find(|(k, _)| k.as_ref() == field) {
            Some((_, list)) => list.push(file),
            None => self.files.push((Arc::from(field), vec![file])),
        }
        self
    }

    fn push_header(&mut self, name: &str, value: &str) {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.to_string()));
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Raw request URI as received (including any query string).
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Normalised path used for matching (base already stripped once the
    /// router has accepted the request).
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    /// Header lookup, case-insensitive. Last write wins.
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

    /// Decoded query parameter. Last write wins (`?a=1&a=2` gives `2`).
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query_params(&self) -> &ParamVec {
        &self.query
    }

    #[must_use]
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Media type of the body, without parameters and lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Decode the body according to `Content-Type`.
    ///
    /// An empty JSON body decodes to `null`.
    pub fn body(&self) -> Result<Body, RequestError> {
        match self.content_type().as_deref() {
            Some("application/json") => {
                if self.body.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Body::Json(Value::Null));
                }
                serde_json::from_slice(&self.body)
                    .map(Body::Json)
                    .map_err(RequestError::InvalidJson)
            }
            Some("application/x-www-form-urlencoded") => Ok(Body::Form(
                url::form_urlencoded::parse(&self.body)
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                    .collect(),
            )),
            Some("multipart/form-data") => Ok(Body::Form(self.form.clone())),
            _ => Ok(Body::Raw(self.body.clone())),
        }
    }

    /// A decoded form field from either a url-encoded or a multipart body.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<String> {
        match self.body() {
            Ok(Body::Form(fields)) => fields
                .into_iter()
                .rfind(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Files uploaded under `field`.
    ///
    /// `None` when the field is absent or its first entry has no file name
    /// (an empty file input). An empty field is not an error.
    #[must_use]
    pub fn files(&self, field: &str) -> Option<&[UploadedFile]> {
        let (_, list) = self.files.iter().find(|(k, _)| k.as_ref() == field)?;
        match list.first() {
            Some(first) if !first.name.is_empty() => Some(list.as_slice()),
            _ => None,
        }
    }
}

/// Parse a raw query string (without the leading `?`) into decoded pairs.
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("x=1&y=hello+world&z=%2Fa");
        assert_eq!(q.len(), 3);
        assert_eq!(q[1].1, "hello world");
        assert_eq!(q[2].1, "/a");
    }

    #[test]
    fn test_path_is_normalised() {
        let req = Request::new(Method::GET, "/users/42/?tab=info#top");
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.query("tab"), Some("info"));
    }

    #[test]
    fn test_method_tokens_are_case_sensitive() {
        let req = Request::parse("get", "/").unwrap();
        assert_ne!(req.method(), &Method::GET);
        assert!(Request::parse("GE T", "/").is_err());
    }

    #[test]
    fn test_upload_error_codes() {
        assert_eq!(UploadError::from_code(0), None);
        assert_eq!(UploadError::from_code(4), Some(UploadError::NoFile));
        assert_eq!(UploadError::from_code(5), Some(UploadError::Unknown));
        assert_eq!(UploadError::NoFile.as_str(), "UPLOAD_ERR_NO_FILE");
    }
}
