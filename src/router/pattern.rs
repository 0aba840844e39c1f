//! Route pattern compilation and matching.
//!
//! Patterns are `/`-delimited templates. A segment of the form `:name` is a
//! named capture; a final `*` segment captures the remainder of the path; the
//! bare pattern `*` matches every path. Everything else must match the
//! corresponding request segment literally (case-sensitive).
//!
//! Matching is a single linear scan over the pre-tokenised segments producing
//! an ordered list of `(name, value)` pairs. No regex engine is involved, so a
//! literal pattern containing regex metacharacters (`/a.b`, `/c++`) behaves as
//! a plain string.

use std::sync::Arc;

use serde::Deserialize;
use smallvec::SmallVec;
use tracing::warn;

/// Maximum number of path parameters kept inline before spilling to the heap.
/// Micro-routes rarely exceed two or three captures.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Ordered `(name, decoded value)` pairs captured by a pattern.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Name under which a trailing `*` segment exposes the rest of the path.
pub const WILDCARD_PARAM: &str = "*";

/// Characters a `:name` capture accepts from a request segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamCharset {
    /// ASCII letters, digits, underscore and hyphen
    Strict,
    /// `Strict` plus `+`, `%`, `;` and `&` (percent-encoded values need `%`)
    #[default]
    Extended,
}

impl ParamCharset {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "strict" => ParamCharset::Strict,
            _ => ParamCharset::Extended,
        }
    }

    #[inline]
    #[must_use]
    pub fn allows(self, c: char) -> bool {
        c.is_ascii_alphanumeric()
            || c == '_'
            || c == '-'
            || (self == ParamCharset::Extended && matches!(c, '+' | '%' | ';' | '&'))
    }
}

/// Outcome of testing one request path against one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    /// Matched without capturing anything
    Matched,
    /// Matched and captured at least one parameter
    Captured(ParamVec),
}

impl MatchResult {
    #[inline]
    #[must_use]
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    /// Captured parameters, `None` unless the result is [`MatchResult::Captured`].
    #[must_use]
    pub fn into_params(self) -> Option<ParamVec> {
        match self {
            MatchResult::Captured(params) => Some(params),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Box<str>),
    Param(Arc<str>),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    CatchAll,
    Segments(Vec<Segment>),
}

/// An immutable, pre-tokenised route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: Arc<str>,
    kind: PatternKind,
}

impl RoutePattern {
    /// Normalise and tokenise `pattern`.
    ///
    /// Trailing slashes are dropped (the root stays `/`), a missing leading
    /// slash is added, and an empty pattern becomes `/`.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let source = normalize_pattern(pattern);
        if source == "*" {
            return Self {
                source: Arc::from(source),
                kind: PatternKind::CatchAll,
            };
        }

        let raw: Vec<&str> = if source == "/" {
            Vec::new()
        } else {
            source[1..].split('/').collect()
        };
        let last = raw.len().saturating_sub(1);
        let segments = raw
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                if *seg == "*" && i == last {
                    Segment::Wildcard
                } else if let Some(name) = seg.strip_prefix(':') {
                    if is_param_name(name) {
                        Segment::Param(Arc::from(name))
                    } else {
                        warn!(
                            pattern = %source,
                            segment = %seg,
                            "Segment starts with ':' but is not a valid parameter name; matching it literally"
                        );
                        Segment::Literal(Box::from(*seg))
                    }
                } else {
                    Segment::Literal(Box::from(*seg))
                }
            })
            .collect();

        Self {
            source: Arc::from(source),
            kind: PatternKind::Segments(segments),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Shared handle on the normalised pattern text.
    #[must_use]
    pub fn source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.kind == PatternKind::CatchAll
    }

    /// Names of the `:name` captures, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        let segments: &[Segment] = match &self.kind {
            PatternKind::CatchAll => &[],
            PatternKind::Segments(segments) => segments,
        };
        segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_ref()),
            _ => None,
        })
    }

    /// Test a normalised request path against this pattern.
    ///
    /// The match is anchored at both ends: `/users/:id` does not match
    /// `/users/42/extra`. Captured values are URL-decoded.
    #[must_use]
    pub fn matches(&self, path: &str, charset: ParamCharset) -> MatchResult {
        if *self.source == *path {
            return MatchResult::Matched;
        }
        match &self.kind {
            PatternKind::CatchAll => MatchResult::Matched,
            PatternKind::Segments(segments) => match_segments(segments, path, charset),
        }
    }

    /// Whether `path` lies under this pattern used as a prefix.
    ///
    /// The leading request segments must satisfy the pattern's segments with
    /// the same literal and `:name` rules as [`RoutePattern::matches`]; the
    /// match must end on a segment boundary, so `/api` covers `/api` and
    /// `/api/ping` but not `/apix`. Nothing is captured. The root pattern
    /// covers every path.
    #[must_use]
    pub fn matches_prefix(&self, path: &str, charset: ParamCharset) -> bool {
        let segments = match &self.kind {
            PatternKind::CatchAll => return true,
            PatternKind::Segments(segments) => segments,
        };
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        let mut actual = (!rest.is_empty()).then(|| rest.split('/')).into_iter().flatten();
        for segment in segments {
            match (segment, actual.next()) {
                (Segment::Wildcard, _) => return true,
                (Segment::Literal(literal), Some(value)) if value == &**literal => {}
                (Segment::Param(_), Some(value))
                    if !value.is_empty() && value.chars().all(|c| charset.allows(c)) => {}
                _ => return false,
            }
        }
        true
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn match_segments(segments: &[Segment], path: &str, charset: ParamCharset) -> MatchResult {
    let Some(rest) = path.strip_prefix('/') else {
        return MatchResult::NoMatch;
    };
    let actual: SmallVec<[&str; 16]> = if rest.is_empty() {
        SmallVec::new()
    } else {
        rest.split('/').collect()
    };

    let mut params = ParamVec::new();
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Wildcard => {
                let remainder = actual.get(i..).map(|s| s.join("/")).unwrap_or_default();
                params.push((Arc::from(WILDCARD_PARAM), decode_component(&remainder)));
                return MatchResult::Captured(params);
            }
            Segment::Literal(literal) => match actual.get(i) {
                Some(value) if *value == &**literal => {}
                _ => return MatchResult::NoMatch,
            },
            Segment::Param(name) => match actual.get(i) {
                Some(value) if !value.is_empty() && value.chars().all(|c| charset.allows(c)) => {
                    params.push((Arc::clone(name), decode_component(value)));
                }
                _ => return MatchResult::NoMatch,
            },
        }
    }

    if segments.len() != actual.len() {
        return MatchResult::NoMatch;
    }
    if params.is_empty() {
        MatchResult::Matched
    } else {
        MatchResult::Captured(params)
    }
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decode a captured value: `+` becomes a space and `%XX` escapes are
/// resolved. Invalid UTF-8 is replaced rather than rejected.
#[must_use]
pub fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Normalise a request URI into a matchable path: query string and fragment
/// are dropped, a leading slash is guaranteed and trailing slashes are removed
/// except for the root.
#[must_use]
pub fn normalize_path(uri: &str) -> String {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    let trimmed = uri[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Normalise a declared pattern. `*` is kept as the catch-all sentinel.
#[must_use]
pub fn normalize_pattern(pattern: &str) -> String {
    let pattern = pattern.trim();
    if pattern == "*" {
        return pattern.to_string();
    }
    normalize_path_segments(pattern)
}

fn normalize_path_segments(pattern: &str) -> String {
    let trimmed = pattern.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Normalise a group or mount prefix to `/segment` form; `/` and the empty
/// string normalise to no prefix at all.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Compose a prefix (already normalised) with a locally declared pattern.
///
/// A local `*` under a prefix becomes `<prefix>/*`, so a catch-all declared
/// inside a group stays within that group.
#[must_use]
pub fn join_pattern(prefix: &str, local: &str) -> String {
    let local = local.trim();
    if prefix.is_empty() {
        return normalize_pattern(local);
    }
    if local == "*" {
        return format!("{prefix}/*");
    }
    if local.is_empty() || local.starts_with('/') {
        normalize_path_segments(&format!("{prefix}{local}"))
    } else {
        normalize_path_segments(&format!("{prefix}/{local}"))
    }
}
