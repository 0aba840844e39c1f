//! # microrouter
//!
//! **microrouter** is a small, synchronous HTTP micro-router. It sits between
//! a host's request loop and application handlers: the host builds a
//! [`Request`](server::Request), the router matches it against an ordered
//! table of declared routes and runs the first matching handler chain, and
//! the host writes out the returned [`Response`](server::Response).
//!
//! ## Overview
//!
//! - Route patterns with `:name` captures and a trailing `*` remainder
//! - Nested prefix groups, scoped middleware and scoped fallbacks
//! - Mountable sub-routers with prepended middleware
//! - First-match-wins in registration order
//! - Handler errors and panics become `500` responses instead of crashing
//!   the host
//!
//! There is no server, no connection handling and no concurrency model of
//! its own; one request is one synchronous call into [`Router::run`].
//!
//! ## Architecture
//!
//! - **[`router`]** - Route table, pattern matching, groups, mount, dispatch
//! - **[`dispatcher`]** - Handler type and handler-chain execution
//! - **[`server`]** - Request accessor, response writer, per-request context
//! - **[`static_files`]** - Directory serving with MIME lookup and cache headers
//! - **[`config`]** - Router options from code, environment or YAML
//! - **[`logging`]** - `tracing-subscriber` initialisation
//! - **[`error`]** - Router and request errors
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Router as router::Router
//!     participant Pattern as router::pattern
//!     participant Dispatcher as dispatcher::execute_chain
//!     participant Handler
//!
//!     Host->>Router: run(Request)
//!     Router->>Router: strip config.base
//!     loop entries in registration order
//!         Router->>Pattern: matches(path, charset)
//!         Pattern-->>Router: MatchResult
//!     end
//!     Router->>Dispatcher: first matching chain
//!     Dispatcher->>Handler: handler(ctx, res)
//!     Handler-->>Dispatcher: Ok / Err / panic
//!     Dispatcher-->>Router: ChainOutcome or HandlerFailure
//!     Router-->>Host: Response (200 / 404 / 500 ...)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use microrouter::{Request, Router};
//!
//! let mut app = Router::new();
//! app.get("/hello/:name", |ctx, res| {
//!     let name = ctx.param("name").unwrap_or("world").to_string();
//!     res.send(format!("hello {name}"));
//!     Ok(())
//! });
//! app.fallback(|_, res| {
//!     res.send("nothing here");
//!     Ok(())
//! });
//!
//! let res = app.run(Request::new(Method::GET, "/hello/ana"));
//! assert_eq!(res.status_code(), 200);
//! assert_eq!(res.body_str(), "hello ana");
//!
//! let res = app.run(Request::new(Method::GET, "/nope"));
//! assert_eq!(res.status_code(), 404);
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod router;
pub mod server;
pub mod static_files;

pub use config::RouterConfig;
pub use dispatcher::{handler, DispatchOutcome, Handler, HandlerResult};
pub use error::{RequestError, RouterError};
pub use ids::RequestId;
pub use router::{MethodSet, ParamCharset, RouteMatch, Router};
pub use server::{Body, Request, RequestContext, Response, UploadedFile};
pub use static_files::StaticOptions;
