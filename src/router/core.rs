use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::pattern::{
    join_pattern, normalize_path, normalize_prefix, ParamCharset, ParamVec, RoutePattern,
    WILDCARD_PARAM,
};
use crate::config::RouterConfig;
use crate::dispatcher::{execute_chain, handler, DispatchOutcome, Handler, HandlerResult};
use crate::error::RouterError;
use crate::server::{Request, RequestContext, Response};
use crate::static_files::{StaticFiles, StaticOptions};

/// The HTTP methods a route answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    /// Every method
    Any,
    /// Only the listed methods (tokens compared case-sensitively)
    Only(SmallVec<[Method; 4]>),
}

impl MethodSet {
    /// Parse a pipe-delimited list such as `"GET|POST"`; `"*"` means every
    /// method. Tokens that are not valid HTTP method tokens are skipped.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec == "*" {
            return MethodSet::Any;
        }
        let methods = spec
            .split('|')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter_map(|t| match Method::from_bytes(t.as_bytes()) {
                Ok(m) => Some(m),
                Err(_) => {
                    warn!(token = %t, "Ignoring invalid HTTP method token");
                    None
                }
            })
            .collect();
        MethodSet::Only(methods)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Only(list) => list.contains(method),
        }
    }
}

impl From<&str> for MethodSet {
    fn from(spec: &str) -> Self {
        MethodSet::parse(spec)
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        MethodSet::Only(smallvec::smallvec![method])
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSet::Any => f.write_str("*"),
            MethodSet::Only(list) => {
                for (i, m) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    f.write_str(m.as_str())?;
                }
                Ok(())
            }
        }
    }
}

/// One registered route: methods, full pattern and handler chain.
#[derive(Clone)]
pub struct RouteEntry {
    methods: MethodSet,
    pattern: RoutePattern,
    handlers: Vec<Handler>,
}

impl RouteEntry {
    #[must_use]
    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern.as_str())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Group prefix a middleware or fallback is confined to. `:name` segments
/// of the prefix accept any value the route matcher would capture.
#[derive(Clone)]
struct Scope {
    prefix: Arc<str>,
    pattern: RoutePattern,
}

impl Scope {
    fn new(prefix: String) -> Self {
        Self {
            pattern: RoutePattern::parse(&prefix),
            prefix: Arc::from(prefix),
        }
    }

    fn contains(&self, path: &str, charset: ParamCharset) -> bool {
        self.prefix.is_empty() || self.pattern.matches_prefix(path, charset)
    }

    fn label(&self) -> &str {
        scope_label(&self.prefix)
    }
}

#[derive(Clone)]
enum Entry {
    Route(RouteEntry),
    /// Runs when reached for in-scope paths; dispatch continues unless it
    /// finalises the response.
    Middleware { scope: Scope, handler: Handler },
    /// Answers in-scope paths that no earlier entry matched.
    Fallback { scope: Scope, handler: Handler },
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Route(route) => fmt::Debug::fmt(route, f),
            Entry::Middleware { scope, .. } => write!(f, "Middleware({:?})", scope.prefix),
            Entry::Fallback { scope, .. } => write!(f, "Fallback({:?})", scope.prefix),
        }
    }
}

/// Result of matching a request against the route table without running
/// any handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Full pattern of the matched route
    pub pattern: Arc<str>,
    /// Captured parameters in pattern order
    pub params: ParamVec,
}

impl RouteMatch {
    /// Get a captured parameter by name. Last write wins on duplicates.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered route table with group prefixes, scoped middleware and
/// fallbacks, dispatched first-match-wins.
///
/// Registration happens up front on a mutable router; dispatch only needs
/// `&self`, so a built router can be shared between threads and dispatched
/// any number of times with identical results.
#[derive(Clone, Default)]
pub struct Router {
    entries: Vec<Entry>,
    /// Group prefix stack, each element already normalised to `/segment`
    prefixes: Vec<String>,
    /// Top-level fallback, consulted once the table is exhausted
    fallback: Option<Handler>,
    config: RouterConfig,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("entries", &self.entries)
            .field("fallback", &self.fallback.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn current_prefix(&self) -> String {
        self.prefixes.concat()
    }

    /// Register a single-handler route for `methods` (a [`Method`] or a
    /// pipe-delimited string such as `"GET|POST"`, `"*"` for every method).
    pub fn route<M, F>(&mut self, methods: M, pattern: &str, f: F) -> &mut Self
    where
        M: Into<MethodSet>,
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route_chain(methods, pattern, vec![handler(f)])
    }

    /// Register a route whose handlers run in order until one finalises the
    /// response.
    pub fn route_chain<M: Into<MethodSet>>(
        &mut self,
        methods: M,
        pattern: &str,
        handlers: Vec<Handler>,
    ) -> &mut Self {
        let methods = methods.into();
        let pattern = RoutePattern::parse(&join_pattern(&self.current_prefix(), pattern));
        debug!(
            methods = %methods,
            pattern = %pattern,
            handlers = handlers.len(),
            position = self.entries.len(),
            "Route registered"
        );
        self.entries.push(Entry::Route(RouteEntry {
            methods,
            pattern,
            handlers,
        }));
        self
    }

    pub fn get<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, f)
    }

    pub fn post<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, f)
    }

    pub fn put<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PUT, pattern, f)
    }

    pub fn patch<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PATCH, pattern, f)
    }

    pub fn delete<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::DELETE, pattern, f)
    }

    /// Register a route answering every method.
    pub fn any<F>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(MethodSet::Any, pattern, f)
    }

    /// Run `registrant` with `prefix` pushed onto the group prefix stack.
    ///
    /// Everything `registrant` registers (routes, nested groups, middleware,
    /// fallbacks, mounts) is composed under the prefix. The prefix is popped
    /// afterwards. A prefix of `/` pushes nothing.
    pub fn group<G>(&mut self, prefix: &str, registrant: G) -> &mut Self
    where
        G: FnOnce(&mut Router),
    {
        let prefix = normalize_prefix(prefix);
        let pushed = !prefix.is_empty();
        if pushed {
            self.prefixes.push(prefix);
        }
        registrant(self);
        if pushed {
            self.prefixes.pop();
        }
        self
    }

    /// Alias of [`Router::group`].
    pub fn with<G>(&mut self, prefix: &str, registrant: G) -> &mut Self
    where
        G: FnOnce(&mut Router),
    {
        self.group(prefix, registrant)
    }

    /// Register middleware at the current position, scoped to the current
    /// group prefix.
    ///
    /// When dispatch reaches it and the path is in scope it runs; dispatch
    /// carries on unless it finalised the response.
    pub fn middleware<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        let scope = Scope::new(self.current_prefix());
        debug!(scope = %scope.label(), position = self.entries.len(), "Middleware registered");
        self.entries.push(Entry::Middleware {
            scope,
            handler: handler(f),
        });
        self
    }

    /// Register a not-found handler. The response status is 404 before it
    /// runs.
    ///
    /// Inside a group it is positional: it answers in-scope requests that no
    /// entry registered before it matched. At top level it answers once the
    /// whole table is exhausted; registering a second one replaces the first.
    pub fn fallback<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        let scope = self.current_prefix();
        self.add_fallback(scope, handler(f));
        self
    }

    fn add_fallback(&mut self, scope: String, h: Handler) {
        if scope.is_empty() {
            if self.fallback.replace(h).is_some() {
                warn!("Replaced existing top-level fallback");
            } else {
                debug!("Top-level fallback registered");
            }
        } else {
            debug!(scope = %scope, position = self.entries.len(), "Scoped fallback registered");
            self.entries.push(Entry::Fallback {
                scope: Scope::new(scope),
                handler: h,
            });
        }
    }

    /// Merge `sub` under `prefix` (relative to the current group prefix).
    ///
    /// Every route of `sub` is re-prefixed and gets `middlewares` prepended
    /// to its chain. Scoped middleware and fallbacks keep their position and
    /// are re-scoped. The top-level fallback of `sub` becomes a fallback
    /// scoped to the mount point.
    pub fn mount(&mut self, prefix: &str, sub: Router, middlewares: Vec<Handler>) -> &mut Self {
        let base = format!("{}{}", self.current_prefix(), normalize_prefix(prefix));
        let mounted = sub.entries.len();

        for entry in sub.entries {
            let entry = match entry {
                Entry::Route(route) => {
                    let mut handlers = middlewares.clone();
                    handlers.extend(route.handlers);
                    Entry::Route(RouteEntry {
                        methods: route.methods,
                        pattern: RoutePattern::parse(&join_pattern(&base, route.pattern.as_str())),
                        handlers,
                    })
                }
                Entry::Middleware { scope, handler } => Entry::Middleware {
                    scope: Scope::new(format!("{base}{}", scope.prefix)),
                    handler,
                },
                Entry::Fallback { scope, handler } => Entry::Fallback {
                    scope: Scope::new(format!("{base}{}", scope.prefix)),
                    handler,
                },
            };
            self.entries.push(entry);
        }
        if let Some(fb) = sub.fallback {
            self.add_fallback(base.clone(), fb);
        }

        info!(
            prefix = %base,
            entries = mounted,
            middlewares = middlewares.len(),
            "Sub-router mounted"
        );
        self
    }

    /// Serve files from `directory` for `GET {route}/*`.
    ///
    /// Extension-less paths get `index.html` when the directory has one, so
    /// a single-page app can own its client-side routes. Missing files and
    /// paths escaping the directory end with 404.
    pub fn serve_static<P: Into<PathBuf>>(
        &mut self,
        route: &str,
        directory: P,
        options: StaticOptions,
    ) -> &mut Self {
        let files = Arc::new(StaticFiles::new(directory, options));
        let pattern = format!("{}/*", normalize_prefix(route));
        info!(
            pattern = %join_pattern(&self.current_prefix(), &pattern),
            directory = %files.base_dir().display(),
            "Static directory registered"
        );
        self.get(&pattern, move |ctx, res| {
            let rest = ctx.param(WILDCARD_PARAM).unwrap_or_default().to_string();
            files.respond(&rest, res)
        })
    }

    /// Registered routes, in precedence order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Route(route) => Some(route),
            _ => None,
        })
    }

    /// Log the route table at info level.
    pub fn dump_routes(&self) {
        info!(
            base = %self.config.base,
            count = self.routes().count(),
            top_level_fallback = self.fallback.is_some(),
            "Route table"
        );
        for (position, entry) in self.entries.iter().enumerate() {
            match entry {
                Entry::Route(route) => info!(
                    position = position,
                    methods = %route.methods,
                    pattern = %route.pattern,
                    handlers = route.handlers.len(),
                    "route"
                ),
                Entry::Middleware { scope, .. } => {
                    info!(position = position, scope = %scope.label(), "middleware")
                }
                Entry::Fallback { scope, .. } => {
                    info!(position = position, scope = %scope.label(), "fallback")
                }
            }
        }
    }

    /// Find the first route matching `method` and `path` without running
    /// anything. Middleware and fallbacks are ignored.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);
        let charset = self.config.param_charset;
        let found = self.routes().find_map(|route| {
            if !route.methods.contains(method) {
                return None;
            }
            let result = route.pattern.matches(&path, charset);
            result.is_match().then(|| RouteMatch {
                pattern: route.pattern.source(),
                params: result.into_params().unwrap_or_default(),
            })
        });
        match &found {
            Some(m) => debug!(method = %method, path = %path, pattern = %m.pattern, "Route matched"),
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        found
    }

    /// Dispatch `ctx` through the route table, writing into `res`.
    ///
    /// Entries are visited in registration order. The first route whose
    /// method set and pattern match has its parameters stored on `ctx` and
    /// its chain executed; nothing after it is considered. With no match the
    /// top-level fallback answers, or [`RouterError::NoRouteMatch`] is
    /// returned.
    pub fn try_dispatch(
        &self,
        ctx: &mut RequestContext,
        res: &mut Response,
    ) -> Result<DispatchOutcome, RouterError> {
        self.scan(&self.entries, ctx, res)
    }

    fn scan(
        &self,
        entries: &[Entry],
        ctx: &mut RequestContext,
        res: &mut Response,
    ) -> Result<DispatchOutcome, RouterError> {
        let method = ctx.method().clone();
        let path = ctx.path().to_string();
        let request_id = ctx.request_id();
        let charset = self.config.param_charset;
        let start = Instant::now();

        for entry in entries {
            match entry {
                Entry::Middleware { scope, handler } => {
                    if !scope.contains(&path, charset) {
                        continue;
                    }
                    execute_chain(scope.label(), std::slice::from_ref(handler), ctx, res)?;
                    if res.is_finalized() {
                        info!(
                            request_id = %request_id,
                            method = %method,
                            path = %path,
                            scope = %scope.label(),
                            status = res.status_code(),
                            "Middleware finalized response"
                        );
                        return Ok(DispatchOutcome::Halted {
                            scope: Arc::clone(&scope.prefix),
                        });
                    }
                }
                Entry::Fallback { scope, handler } => {
                    if !scope.contains(&path, charset) {
                        continue;
                    }
                    return run_fallback(&scope.prefix, handler, ctx, res);
                }
                Entry::Route(route) => {
                    if !route.methods.contains(&method) {
                        continue;
                    }
                    let result = route.pattern.matches(&path, charset);
                    if !result.is_match() {
                        continue;
                    }
                    ctx.set_params(result.into_params());
                    info!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        pattern = %route.pattern,
                        path_params = ?ctx.params(),
                        duration_us = start.elapsed().as_micros() as u64,
                        "Route matched"
                    );
                    execute_chain(route.pattern.as_str(), &route.handlers, ctx, res)?;
                    return Ok(DispatchOutcome::Routed {
                        pattern: route.pattern.source(),
                    });
                }
            }
        }

        if let Some(fb) = &self.fallback {
            return run_fallback(&Arc::from(""), fb, ctx, res);
        }

        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            duration_us = start.elapsed().as_micros() as u64,
            "No route matched"
        );
        Err(RouterError::NoRouteMatch { method, path })
    }

    /// Dispatch `ctx` and return the finished response.
    ///
    /// No match becomes `404 Not Found`; a handler failure becomes
    /// `500 Internal Server Error` carrying the failure detail.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> Response {
        let mut res = Response::new();
        let result = self.try_dispatch(ctx, &mut res);
        into_response(result, res)
    }

    /// Handle one request end to end: strip the configured base, then
    /// dispatch. Requests outside the base only reach the top-level fallback.
    pub fn run(&self, request: Request) -> Response {
        let mut ctx = RequestContext::new(request);
        match self.config.strip_base(ctx.path()) {
            Some(stripped) => {
                ctx.request_mut().set_path(stripped);
                self.dispatch(&mut ctx)
            }
            None => {
                debug!(
                    request_id = %ctx.request_id(),
                    path = %ctx.path(),
                    base = %self.config.base,
                    "Request outside configured base"
                );
                let mut res = Response::new();
                let result = self.scan(&[], &mut ctx, &mut res);
                into_response(result, res)
            }
        }
    }
}

/// Finish a dispatch. The default 404 and the failure 500 replace status
/// and body but keep headers middleware already wrote.
fn into_response(result: Result<DispatchOutcome, RouterError>, mut res: Response) -> Response {
    match result {
        Ok(_) => {
            res.finalize();
            res
        }
        Err(RouterError::NoRouteMatch { .. }) => Response::not_found().with_headers_from(&res),
        Err(RouterError::HandlerFailure { detail, .. }) => {
            Response::internal_error(&detail).with_headers_from(&res)
        }
    }
}

fn scope_label(scope: &str) -> &str {
    if scope.is_empty() {
        "/"
    } else {
        scope
    }
}

fn run_fallback(
    scope: &Arc<str>,
    handler: &Handler,
    ctx: &mut RequestContext,
    res: &mut Response,
) -> Result<DispatchOutcome, RouterError> {
    info!(
        request_id = %ctx.request_id(),
        method = %ctx.method(),
        path = %ctx.path(),
        scope = %scope_label(scope),
        "Fallback handling request"
    );
    res.status(404);
    execute_chain(scope_label(scope), std::slice::from_ref(handler), ctx, res)?;
    Ok(DispatchOutcome::Fallback {
        scope: Arc::clone(scope),
    })
}
