use std::path::PathBuf;

use http::Method;
use microrouter::server::UploadError;
use microrouter::{Body, Request, UploadedFile};
use serde_json::json;

fn upload(name: &str, error: Option<UploadError>) -> UploadedFile {
    UploadedFile {
        name: name.to_string(),
        temp_path: PathBuf::from(format!("/tmp/upload-{name}")),
        mime_type: "text/plain".to_string(),
        size: 12,
        error,
    }
}

#[test]
fn test_headers_are_case_insensitive() {
    let req = Request::new(Method::GET, "/")
        .with_header("X-Api-Key", "first")
        .with_header("x-api-key", "second");
    assert_eq!(req.header("X-API-KEY"), Some("second"));
    assert!(req.header("missing").is_none());
}

#[test]
fn test_query_parameters_are_decoded() {
    let req = Request::new(Method::GET, "/search?q=rust+router&tag=a%26b&page=1&page=2");
    assert_eq!(req.path(), "/search");
    assert_eq!(req.query("q"), Some("rust router"));
    assert_eq!(req.query("tag"), Some("a&b"));
    assert_eq!(req.query("page"), Some("2"));
    assert_eq!(req.query_params().len(), 4);
}

#[test]
fn test_json_body() {
    let req = Request::new(Method::POST, "/")
        .with_header("Content-Type", "application/json; charset=utf-8")
        .with_body(r#"{"name":"widget","qty":3}"#);
    assert_eq!(
        req.body().unwrap(),
        Body::Json(json!({ "name": "widget", "qty": 3 }))
    );
}

#[test]
fn test_empty_json_body_is_null() {
    let req = Request::new(Method::POST, "/").with_header("content-type", "application/json");
    assert_eq!(req.body().unwrap(), Body::Json(serde_json::Value::Null));
}

#[test]
fn test_invalid_json_body_is_an_error() {
    let req = Request::new(Method::POST, "/")
        .with_header("content-type", "application/json")
        .with_body("[1,");
    assert!(req.body().is_err());
}

#[test]
fn test_urlencoded_form_body() {
    let req = Request::new(Method::POST, "/login")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("user=ana+b&pass=p%40ss");
    assert_eq!(req.form_field("user").as_deref(), Some("ana b"));
    assert_eq!(req.form_field("pass").as_deref(), Some("p@ss"));
    assert!(req.form_field("other").is_none());
}

#[test]
fn test_multipart_fields_come_from_host() {
    let req = Request::new(Method::POST, "/upload")
        .with_header("Content-Type", "multipart/form-data; boundary=xyz")
        .with_form_field("title", "holiday");
    assert_eq!(req.form_field("title").as_deref(), Some("holiday"));
}

#[test]
fn test_other_content_is_raw() {
    let req = Request::new(Method::PUT, "/blob")
        .with_header("content-type", "application/octet-stream")
        .with_body(vec![0u8, 159, 146, 150]);
    assert_eq!(req.body().unwrap(), Body::Raw(vec![0, 159, 146, 150]));
    assert_eq!(req.raw_body().len(), 4);

    let req = Request::new(Method::PUT, "/blob").with_body("plain");
    assert_eq!(req.body().unwrap(), Body::Raw(b"plain".to_vec()));
}

#[test]
fn test_files_by_field() {
    let req = Request::new(Method::POST, "/upload")
        .with_file("docs", upload("a.txt", None))
        .with_file("docs", upload("b.txt", Some(UploadError::Partial)))
        .with_file("empty", upload("", Some(UploadError::NoFile)));

    let docs = req.files("docs").unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].name, "a.txt");
    assert_eq!(docs[1].error.map(UploadError::as_str), Some("UPLOAD_ERR_PARTIAL"));

    assert!(req.files("empty").is_none());
    assert!(req.files("absent").is_none());
}

#[test]
fn test_from_http_keeps_headers_and_body() {
    let req = http::Request::builder()
        .method(Method::PATCH)
        .uri("https://example.com/items/3?dry_run=true")
        .header("Content-Type", "application/json")
        .body(br#"{"qty":1}"#.to_vec())
        .unwrap();
    let req = Request::from_http(req);
    assert_eq!(req.method(), &Method::PATCH);
    assert_eq!(req.path(), "/items/3");
    assert_eq!(req.query("dry_run"), Some("true"));
    assert_eq!(req.content_type().as_deref(), Some("application/json"));
    assert_eq!(req.body().unwrap(), Body::Json(json!({ "qty": 1 })));
}
