//! # Router Module
//!
//! Route registration, prefix composition and first-match dispatch.
//!
//! ## Overview
//!
//! The router owns an ordered route table. Each entry is one of:
//!
//! - a **route**: a method set, a full pattern and a handler chain
//! - a **middleware**: a handler scoped to a group prefix that runs when
//!   dispatch reaches it
//! - a **fallback**: a handler scoped to a group prefix that answers in-scope
//!   requests no earlier entry matched
//!
//! ## Architecture
//!
//! The router works in two phases:
//!
//! 1. **Registration**: `get`/`post`/.../`route` append entries. `group`
//!    pushes a prefix for the duration of a registrant closure, so nested
//!    groups compose (`/api` + `/v1` + `/users/:id`). `mount` merges a
//!    pre-built sub-router under a prefix.
//!
//! 2. **Dispatch**: entries are visited in registration order. The first
//!    route whose method set and pattern match the request runs its chain and
//!    dispatch stops. Declaration order always wins, never specificity.
//!
//! ```mermaid
//! flowchart TD
//!     A[Request] --> B{base stripped?}
//!     B -- no --> F[top-level fallback / 404]
//!     B -- yes --> C[next entry]
//!     C --> D{kind}
//!     D -- middleware in scope --> M[run] --> E{finalized?}
//!     E -- yes --> Z[done]
//!     E -- no --> C
//!     D -- fallback in scope --> Z
//!     D -- route matches --> R[set params, run chain] --> Z
//!     C -- table exhausted --> F
//! ```
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use microrouter::router::Router;
//! use microrouter::server::Request;
//!
//! let mut router = Router::new();
//! router
//!     .get("/", |_, res| {
//!         res.send("home");
//!         Ok(())
//!     })
//!     .get("/users/:id", |ctx, res| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         res.send(id);
//!         Ok(())
//!     })
//!     .group("/api", |api| {
//!         api.get("/ping", |_, res| res.send_json(&serde_json::json!({ "ok": true })));
//!     });
//!
//! let res = router.run(Request::new(Method::GET, "/users/7"));
//! assert_eq!(res.body_str(), "7");
//!
//! let m = router.match_route(&Method::GET, "/api/ping").unwrap();
//! assert_eq!(&*m.pattern, "/api/ping");
//! ```

mod core;
pub mod pattern;
#[cfg(test)]
mod tests;

pub use core::{MethodSet, RouteEntry, RouteMatch, Router};
pub use pattern::{MatchResult, ParamCharset, ParamVec, RoutePattern, WILDCARD_PARAM};
