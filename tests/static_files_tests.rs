mod common;

use common::{get, temp_site};
use microrouter::{Response, Router, StaticOptions};

#[test]
fn test_serves_file_with_mime_and_cache_headers() {
    let site = temp_site::build();
    let mut router = Router::new();
    router.serve_static("/assets", site.path(), StaticOptions::default());

    let res = get(&router, "/assets/css/site.css");
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header("content-type"), Some("text/css"));
    assert_eq!(res.header("cache-control"), Some("max-age=3600"));
    assert_eq!(res.body_str(), "body{}");

    let res = get(&router, "/assets/app.js");
    assert_eq!(res.header("content-type"), Some("text/javascript"));
}

#[test]
fn test_extensionless_paths_get_index() {
    let site = temp_site::build();
    let mut router = Router::new();
    router.serve_static("/", site.path(), StaticOptions::default());

    for uri in ["/", "/dashboard", "/settings/profile"] {
        let res = get(&router, uri);
        assert_eq!(res.status_code(), 200, "uri {uri}");
        assert_eq!(res.body_str(), "<h1>spa</h1>");
        assert_eq!(res.header("content-type"), Some("text/html"));
    }
}

#[test]
fn test_missing_file_is_404() {
    let site = temp_site::build();
    let mut router = Router::new();
    router.serve_static("/assets", site.path(), StaticOptions::default());
    assert_eq!(get(&router, "/assets/nope.png").status_code(), 404);

    let bare = temp_site::build_without_index();
    let mut router = Router::new();
    router.serve_static("/assets", bare.path(), StaticOptions::default());
    assert_eq!(get(&router, "/assets/dashboard").status_code(), 404);
}

#[test]
fn test_traversal_is_rejected() {
    let site = temp_site::build();
    let public = site.path().join("css");
    let mut router = Router::new();
    router.serve_static("/assets", &public, StaticOptions::default());

    assert_eq!(get(&router, "/assets/site.css").status_code(), 200);
    assert_eq!(get(&router, "/assets/../app.js").status_code(), 404);
    assert_eq!(get(&router, "/assets/%2e%2e/app.js").status_code(), 404);
}

#[test]
fn test_options_override_mime_and_max_age() {
    let site = temp_site::build();
    let options = StaticOptions::new()
        .with_max_age_minutes(1)
        .with_mime_type("md", "text/markdown")
        .with_mime_type("js", "application/javascript");
    let mut router = Router::new();
    router.serve_static("/files", site.path(), options);

    let res = get(&router, "/files/notes.md");
    assert_eq!(res.header("content-type"), Some("text/markdown"));
    assert_eq!(res.header("cache-control"), Some("max-age=60"));

    let res = get(&router, "/files/app.js");
    assert_eq!(res.header("content-type"), Some("application/javascript"));
}

#[test]
fn test_static_inside_group_composes_prefix() {
    let site = temp_site::build();
    let mut router = Router::new();
    router.group("/v1", |v1| {
        v1.serve_static("/public", site.path(), StaticOptions::default());
    });
    assert_eq!(get(&router, "/v1/public/data.json").body_str(), r#"{"n":1}"#);
    assert_eq!(get(&router, "/public/data.json").status_code(), 404);
}

#[test]
fn test_send_file_removes_stale_cache_headers() {
    let site = temp_site::build();
    let mut res = Response::new();
    res.set_header("Expires", "0").set_header("Pragma", "no-cache");
    res.send_file(site.path().join("data.json"), &StaticOptions::default())
        .unwrap();
    assert!(res.header("expires").is_none());
    assert!(res.header("pragma").is_none());
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert!(res.is_finalized());
}
