use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::RouterError;
use crate::server::{RequestContext, Response};

/// Result type returned by every handler; use `?` freely inside handlers.
pub type HandlerResult = anyhow::Result<()>;

/// A shareable handler callable.
///
/// Handlers receive the per-request context and the response under
/// construction. Route chains, middlewares and fallbacks all use this type.
pub type Handler = Arc<dyn Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync>;

/// Box a closure into a [`Handler`], for building chains.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How a handler chain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every handler ran
    Completed,
    /// A handler finalised the response; the rest of the chain was skipped
    Finalized,
}

/// Where dispatch of a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The chain of the route with this full pattern ran
    Routed { pattern: Arc<str> },
    /// A middleware with this scope finalised the response first
    Halted { scope: Arc<str> },
    /// A fallback with this scope (empty for top level) answered
    Fallback { scope: Arc<str> },
}

impl DispatchOutcome {
    /// `true` when a route (rather than a middleware or fallback) answered.
    #[must_use]
    pub fn is_routed(&self) -> bool {
        matches!(self, DispatchOutcome::Routed { .. })
    }
}

/// Render a panic payload for diagnostics.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `handlers` in order against one request.
///
/// Stops early once the response is finalised. A handler returning `Err` or
/// panicking aborts the chain with [`RouterError::HandlerFailure`] labelled
/// with `label` (the route pattern or the middleware/fallback scope).
pub fn execute_chain(
    label: &str,
    handlers: &[Handler],
    ctx: &mut RequestContext,
    res: &mut Response,
) -> Result<ChainOutcome, RouterError> {
    let request_id = ctx.request_id();
    let start = Instant::now();

    for (index, h) in handlers.iter().enumerate() {
        if res.is_finalized() {
            debug!(
                request_id = %request_id,
                pattern = %label,
                skipped = handlers.len() - index,
                "Response finalized, skipping rest of chain"
            );
            return Ok(ChainOutcome::Finalized);
        }

        match catch_unwind(AssertUnwindSafe(|| h(ctx, res))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let detail = format!("{e:#}");
                error!(
                    request_id = %request_id,
                    pattern = %label,
                    handler_index = index,
                    error = %detail,
                    "Handler returned an error"
                );
                return Err(RouterError::HandlerFailure {
                    pattern: label.to_string(),
                    detail,
                });
            }
            Err(payload) => {
                let detail = panic_message(&*payload);
                error!(
                    request_id = %request_id,
                    pattern = %label,
                    handler_index = index,
                    panic_message = %detail,
                    "Handler panicked"
                );
                return Err(RouterError::HandlerFailure {
                    pattern: label.to_string(),
                    detail: format!("handler panicked: {detail}"),
                });
            }
        }
    }

    info!(
        request_id = %request_id,
        pattern = %label,
        handlers = handlers.len(),
        status = res.status_code(),
        execution_time_us = start.elapsed().as_micros() as u64,
        "Handler chain complete"
    );
    Ok(if res.is_finalized() {
        ChainOutcome::Finalized
    } else {
        ChainOutcome::Completed
    })
}
