#![allow(dead_code)]

use http::Method;
use microrouter::{Request, Response, Router};

/// Run a synthetic request through `router`.
pub fn send(router: &Router, method: Method, uri: &str) -> Response {
    router.run(Request::new(method, uri))
}

pub fn get(router: &Router, uri: &str) -> Response {
    send(router, Method::GET, uri)
}

pub mod temp_site {
    use std::fs;
    use tempfile::TempDir;

    /// A throwaway static site:
    ///
    /// ```text
    /// index.html
    /// app.js
    /// data.json
    /// css/site.css
    /// notes.md
    /// ```
    pub fn build() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>spa</h1>").unwrap();
        fs::write(dir.path().join("app.js"), "console.log('app');\n").unwrap();
        fs::write(dir.path().join("data.json"), r#"{"n":1}"#).unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();
        fs::write(dir.path().join("notes.md"), "# notes").unwrap();
        dir
    }

    /// Same as [`build`] without an `index.html`.
    pub fn build_without_index() -> TempDir {
        let dir = build();
        fs::remove_file(dir.path().join("index.html")).unwrap();
        dir
    }
}
