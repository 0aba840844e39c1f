pub mod context;
pub mod request;
pub mod response;

pub use context::RequestContext;
pub use request::{parse_query_params, Body, HeaderVec, Request, UploadError, UploadedFile};
pub use response::{status_reason, Response};
