use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;

use super::pattern::{
    decode_component, join_pattern, normalize_path, normalize_prefix, MatchResult,
    ParamCharset, RoutePattern,
};
use super::{MethodSet, Router};
use crate::server::{Request, RequestContext, Response};

fn captured(result: MatchResult) -> Vec<(String, String)> {
    result
        .into_params()
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn pair(k: &str, v: &str) -> (String, String) {
    (k.to_string(), v.to_string())
}

#[test]
fn test_root_pattern_only_matches_root() {
    let p = RoutePattern::parse("/");
    assert_eq!(p.matches("/", ParamCharset::Extended), MatchResult::Matched);
    assert!(!p.matches("/a", ParamCharset::Extended).is_match());
}

#[test]
fn test_literal_pattern_matches_without_params() {
    let p = RoutePattern::parse("/about/team");
    assert_eq!(p.matches("/about/team", ParamCharset::Extended), MatchResult::Matched);
    assert!(!p.matches("/about/Team", ParamCharset::Extended).is_match());
}

#[test]
fn test_regex_metacharacters_are_literal() {
    let p = RoutePattern::parse("/c++/a.b");
    assert!(p.matches("/c++/a.b", ParamCharset::Extended).is_match());
    assert!(!p.matches("/c++/axb", ParamCharset::Extended).is_match());
}

#[test]
fn test_param_capture_is_anchored() {
    let p = RoutePattern::parse("/users/:id");
    assert_eq!(
        captured(p.matches("/users/42", ParamCharset::Extended)),
        vec![pair("id", "42")]
    );
    assert!(!p.matches("/users/42/extra", ParamCharset::Extended).is_match());
    assert!(!p.matches("/users", ParamCharset::Extended).is_match());
}

#[test]
fn test_param_values_are_decoded() {
    let p = RoutePattern::parse("/users/:id");
    assert_eq!(
        captured(p.matches("/users/42%20x", ParamCharset::Extended)),
        vec![pair("id", "42 x")]
    );
    assert_eq!(
        captured(p.matches("/users/a+b", ParamCharset::Extended)),
        vec![pair("id", "a b")]
    );
}

#[test]
fn test_strict_charset_rejects_extended_chars() {
    let p = RoutePattern::parse("/tags/:tag");
    assert!(p.matches("/tags/a%20b", ParamCharset::Extended).is_match());
    assert!(!p.matches("/tags/a%20b", ParamCharset::Strict).is_match());
    assert!(p.matches("/tags/rust-lang_2", ParamCharset::Strict).is_match());
    assert!(!p.matches("/tags/a.b", ParamCharset::Extended).is_match());
}

#[test]
fn test_multiple_params_keep_order() {
    let p = RoutePattern::parse("/org/:org/repo/:repo");
    assert_eq!(
        p.param_names().collect::<Vec<_>>(),
        vec!["org", "repo"]
    );
    assert_eq!(
        captured(p.matches("/org/acme/repo/web", ParamCharset::Extended)),
        vec![pair("org", "acme"), pair("repo", "web")]
    );
}

#[test]
fn test_catch_all_pattern() {
    let p = RoutePattern::parse("*");
    assert!(p.is_catch_all());
    assert_eq!(p.matches("/anything/at/all", ParamCharset::Strict), MatchResult::Matched);
}

#[test]
fn test_trailing_wildcard_captures_remainder() {
    let p = RoutePattern::parse("/static/*");
    assert_eq!(
        captured(p.matches("/static/css/site.css", ParamCharset::Extended)),
        vec![pair("*", "css/site.css")]
    );
    assert_eq!(
        captured(p.matches("/static", ParamCharset::Extended)),
        vec![pair("*", "")]
    );
    assert!(!p.matches("/other/x", ParamCharset::Extended).is_match());
}

#[test]
fn test_pattern_normalisation() {
    assert_eq!(RoutePattern::parse("users/").as_str(), "/users");
    assert_eq!(RoutePattern::parse("").as_str(), "/");
    assert_eq!(normalize_path("/a/b/?q=1"), "/a/b");
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_prefix("/"), "");
    assert_eq!(normalize_prefix("api/"), "/api");
}

#[test]
fn test_join_pattern() {
    assert_eq!(join_pattern("/api", "/widgets"), "/api/widgets");
    assert_eq!(join_pattern("/api", "widgets/"), "/api/widgets");
    assert_eq!(join_pattern("/api", "/"), "/api");
    assert_eq!(join_pattern("/api", "*"), "/api/*");
    assert_eq!(join_pattern("", "*"), "*");
}

#[test]
fn test_prefix_match_respects_segment_boundary() {
    let api = RoutePattern::parse("/api");
    assert!(api.matches_prefix("/api", ParamCharset::Extended));
    assert!(api.matches_prefix("/api/ping", ParamCharset::Extended));
    assert!(!api.matches_prefix("/apix", ParamCharset::Extended));
    assert!(!api.matches_prefix("/", ParamCharset::Extended));
    assert!(RoutePattern::parse("/").matches_prefix("/anything", ParamCharset::Extended));
}

#[test]
fn test_prefix_match_accepts_param_segments() {
    let org = RoutePattern::parse("/orgs/:org/teams");
    assert!(org.matches_prefix("/orgs/acme/teams", ParamCharset::Extended));
    assert!(org.matches_prefix("/orgs/acme/teams/7", ParamCharset::Extended));
    assert!(!org.matches_prefix("/orgs/acme", ParamCharset::Extended));
    assert!(!org.matches_prefix("/orgs//teams", ParamCharset::Extended));
    assert!(!org.matches_prefix("/orgs/a;b/teams", ParamCharset::Strict));
}

#[test]
fn test_invalid_param_name_is_literal() {
    let pattern = RoutePattern::parse("/files/:name.json");
    assert_eq!(pattern.param_names().count(), 0);
    assert_eq!(
        pattern.matches("/files/:name.json", ParamCharset::Extended),
        MatchResult::Matched
    );
    assert!(!pattern.matches("/files/report", ParamCharset::Extended).is_match());
}

#[test]
fn test_decode_component_is_lossy() {
    assert_eq!(decode_component("%E2%9C%93"), "\u{2713}");
    assert_eq!(decode_component("%FF"), "\u{FFFD}");
}

#[test]
fn test_method_set_parse() {
    let set = MethodSet::parse("GET|POST");
    assert!(set.contains(&Method::GET));
    assert!(set.contains(&Method::POST));
    assert!(!set.contains(&Method::PUT));
    assert_eq!(set.to_string(), "GET|POST");

    assert!(MethodSet::parse("*").contains(&Method::DELETE));
    assert!(!MethodSet::parse("get").contains(&Method::GET));
}

#[test]
fn test_group_composes_and_restores_prefix() {
    let mut router = Router::new();
    router.group("/api", |api| {
        api.get("/widgets", |_, _| Ok(()));
        api.group("v1/", |v1| {
            v1.get("/users/:id", |_, _| Ok(()));
        });
    });
    router.get("/widgets", |_, _| Ok(()));
    router.group("/", |root| {
        root.get("/plain", |_, _| Ok(()));
    });

    let patterns: Vec<&str> = router.routes().map(|r| r.pattern().as_str()).collect();
    assert_eq!(
        patterns,
        vec!["/api/widgets", "/api/v1/users/:id", "/widgets", "/plain"]
    );
}

#[test]
fn test_with_is_group_alias() {
    let mut router = Router::new();
    router.with("/admin", |admin| {
        admin.any("/", |_, _| Ok(()));
    });
    let entry = router.routes().next().unwrap();
    assert_eq!(entry.pattern().as_str(), "/admin");
    assert_eq!(entry.methods(), &MethodSet::Any);
}

#[test]
fn test_mount_reprefixes_and_prepends_middlewares() {
    let mut sub = Router::new();
    sub.get("/", |_, _| Ok(()));
    sub.route_chain(
        "GET|POST",
        "/items/:id",
        vec![crate::handler(|_, _| Ok(())), crate::handler(|_, _| Ok(()))],
    );

    let mut app = Router::new();
    app.group("/v2", |v2| {
        v2.mount("/shop", sub, vec![crate::handler(|_, _| Ok(()))]);
    });

    let routes: Vec<(String, usize)> = app
        .routes()
        .map(|r| (r.pattern().to_string(), r.handler_count()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("/v2/shop".to_string(), 2),
            ("/v2/shop/items/:id".to_string(), 3)
        ]
    );
}

#[test]
fn test_dispatch_does_not_mutate_table() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let mut router = Router::new();
    router.get("/items/:id", move |_, res| {
        counter.fetch_add(1, Ordering::SeqCst);
        res.send("ok");
        Ok(())
    });

    let before = router.routes().count();
    for _ in 0..2 {
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/items/3"));
        let mut res = Response::new();
        let outcome = router.try_dispatch(&mut ctx, &mut res).unwrap();
        assert!(outcome.is_routed());
        assert_eq!(ctx.param("id"), Some("3"));
    }
    assert_eq!(router.routes().count(), before);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_match_route_ignores_middleware_and_fallbacks() {
    let mut router = Router::new();
    router.middleware(|_, res| {
        res.end(401);
        Ok(())
    });
    router.fallback(|_, _| Ok(()));
    router.get("/items/:id", |_, _| Ok(()));

    let m = router.match_route(&Method::GET, "/items/9/").unwrap();
    assert_eq!(&*m.pattern, "/items/:id");
    assert_eq!(m.param("id"), Some("9"));
    assert!(router.match_route(&Method::POST, "/items/9").is_none());
}
