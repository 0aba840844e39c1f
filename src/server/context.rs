use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::request::Request;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::pattern::ParamVec;

type CtxValue = Arc<dyn Any + Send + Sync>;

/// Per-request state handed to every handler in a chain.
///
/// Holds the [`Request`], the parameters captured by the matched route (set
/// at most once per dispatch) and a write-once key/value bag for sharing
/// resources (a database handle, an authenticated user) between handlers.
pub struct RequestContext {
    request: Request,
    request_id: RequestId,
    params: Option<ParamVec>,
    bag: HashMap<String, CtxValue>,
}

impl RequestContext {
    /// Wrap a request. An `x-request-id` header holding a ULID is reused as
    /// the request id.
    #[must_use]
    pub fn new(request: Request) -> Self {
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        Self {
            request,
            request_id,
            params: None,
            bag: HashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub(crate) fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    #[must_use]
    pub fn into_request(self) -> Request {
        self.request
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &http::Method {
        self.request.method()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.request.path()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.query(name)
    }

    /// Captured path parameter. With duplicate names the last capture wins.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .as_ref()?
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// All captured parameters, `None` when the matched route captured none.
    #[must_use]
    pub fn params(&self) -> Option<&ParamVec> {
        self.params.as_ref()
    }

    pub(crate) fn set_params(&mut self, params: Option<ParamVec>) {
        self.params = params;
    }

    /// Store `value` under `key`. Each key can be written once; a second
    /// write is refused and returns `false`.
    pub fn set_ctx<T: Any + Send + Sync>(&mut self, key: &str, value: T) -> bool {
        if self.bag.contains_key(key) {
            warn!(
                request_id = %self.request_id,
                key = %key,
                "Context key already set, keeping the first value"
            );
            return false;
        }
        self.bag.insert(key.to_string(), Arc::new(value));
        true
    }

    /// Typed read from the context bag; `None` when the key is unset or
    /// holds a different type.
    #[must_use]
    pub fn get_ctx<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.bag.get(key)?.downcast_ref::<T>()
    }

    /// Shared handle on a bag value, for handlers that need to keep it.
    #[must_use]
    pub fn get_ctx_arc<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        Arc::clone(self.bag.get(key)?).downcast::<T>().ok()
    }

    #[must_use]
    pub fn has_ctx(&self, key: &str) -> bool {
        self.bag.contains_key(key)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request", &self.request)
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("ctx_keys", &self.bag.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_ctx_is_write_once() {
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/"));
        assert!(ctx.set_ctx("db", String::from("primary")));
        assert!(!ctx.set_ctx("db", String::from("replica")));
        assert_eq!(ctx.get_ctx::<String>("db").map(String::as_str), Some("primary"));
    }

    #[test]
    fn test_ctx_wrong_type_is_none() {
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/"));
        ctx.set_ctx("count", 3u32);
        assert!(ctx.get_ctx::<i64>("count").is_none());
        assert_eq!(ctx.get_ctx_arc::<u32>("count").as_deref(), Some(&3));
    }

    #[test]
    fn test_param_last_write_wins() {
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/"));
        assert!(ctx.param("id").is_none());
        let mut params = ParamVec::new();
        params.push((Arc::from("id"), "org".to_string()));
        params.push((Arc::from("id"), "user".to_string()));
        ctx.set_params(Some(params));
        assert_eq!(ctx.param("id"), Some("user"));
    }

    #[test]
    fn test_request_id_from_header() {
        let id = RequestId::new();
        let req = Request::new(Method::GET, "/").with_header("X-Request-Id", &id.to_string());
        assert_eq!(RequestContext::new(req).request_id(), id);
    }
}
