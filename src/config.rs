//! # Router Configuration Module
//!
//! Construction-time options for a [`Router`](crate::router::Router).
//!
//! ## Options
//!
//! | Option | Purpose |
//! |---|---|
//! | `base` | Global URI prefix stripped before matching (sub-directory deployments) |
//! | `layout` | Default layout template name, kept for the host's rendering layer |
//! | `root` | Base directory for template resolution, kept for the host's rendering layer |
//! | `param_charset` | Characters accepted by `:name` captures (`extended` or `strict`) |
//!
//! ## Sources
//!
//! Options can be set in code with the `with_*` builders, read from the
//! environment with [`RouterConfig::from_env()`], or loaded from YAML:
//!
//! ```yaml
//! base: /app
//! layout: main
//! root: ./site
//! param_charset: strict
//! ```
//!
//! ## Environment Variables
//!
//! - `MICROROUTER_BASE`
//! - `MICROROUTER_LAYOUT`
//! - `MICROROUTER_ROOT`
//! - `MICROROUTER_PARAM_CHARSET` (`extended` | `strict`, default `extended`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::router::pattern::{normalize_prefix, ParamCharset};

/// Options recognised by the router at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Global URI prefix stripped from request paths before matching
    pub base: String,
    /// Default layout template (consumed by the host's renderer, not the router)
    pub layout: Option<String>,
    /// Base directory for template resolution (consumed by the host's renderer)
    pub root: PathBuf,
    /// Character class accepted by `:name` captures
    pub param_charset: ParamCharset,
}

impl RouterConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = normalize_prefix(base);
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: &str) -> Self {
        self.layout = Some(layout.to_string());
        self
    }

    #[must_use]
    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_param_charset(mut self, charset: ParamCharset) -> Self {
        self.param_charset = charset;
        self
    }

    /// Load configuration from `MICROROUTER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            base: env::var("MICROROUTER_BASE")
                .map(|b| normalize_prefix(&b))
                .unwrap_or_default(),
            layout: env::var("MICROROUTER_LAYOUT").ok().filter(|l| !l.is_empty()),
            root: env::var("MICROROUTER_ROOT").map(PathBuf::from).unwrap_or_default(),
            param_charset: env::var("MICROROUTER_PARAM_CHARSET")
                .map(|c| ParamCharset::parse(&c))
                .unwrap_or_default(),
        }
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: RouterConfig =
            serde_yaml::from_str(yaml).context("Failed to parse router config YAML")?;
        config.base = normalize_prefix(&config.base);
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read router config {}", path.display()))?;
        Self::from_yaml_str(&yaml)
    }

    /// Strip the configured base from `path`.
    ///
    /// Returns `None` when `path` does not lie under the base (on a segment
    /// boundary). With no base configured the path is returned unchanged.
    #[must_use]
    pub fn strip_base(&self, path: &str) -> Option<String> {
        let base = normalize_prefix(&self.base);
        if base.is_empty() {
            return Some(path.to_string());
        }
        match path.strip_prefix(base.as_str()) {
            Some("") => Some("/".to_string()),
            Some(rest) if rest.starts_with('/') => Some(rest.to_string()),
            _ => None,
        }
    }
}
