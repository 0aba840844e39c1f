//! # Dispatcher Module
//!
//! Executes handler chains for the router.
//!
//! ## Overview
//!
//! Once the router has picked an entry for a request, the dispatcher:
//! - Runs the entry's handlers in order against the same
//!   [`RequestContext`](crate::server::RequestContext) and
//!   [`Response`](crate::server::Response)
//! - Stops the chain as soon as a handler finalises the response
//! - Converts handler errors and panics into
//!   [`RouterError::HandlerFailure`](crate::error::RouterError::HandlerFailure)
//!
//! ## Handlers
//!
//! ```rust
//! use microrouter::dispatcher::{handler, Handler};
//!
//! let auth: Handler = handler(|ctx, res| {
//!     if ctx.header("authorization").is_none() {
//!         res.end(401);
//!     }
//!     Ok(())
//! });
//! ```
//!
//! ## Error Handling
//!
//! - A handler returning `Err` aborts the chain; the router answers 500 with
//!   the rendered error chain as diagnostic text
//! - A panicking handler is caught and treated the same way
//! - Nothing is retried; every dispatch is one-shot

mod core;

pub use core::{execute_chain, handler, ChainOutcome, DispatchOutcome, Handler, HandlerResult};
