//! HTTP layer for Hydra servers.
//!
//! Request/response types, a small path router and a hyper-based connection
//! loop. The SSR pipeline in `hydra-react` plugs into this as router
//! handlers.

pub mod application;
pub mod error;
pub mod http;
pub mod routing;
pub mod status;

pub use application::Application;
pub use error::Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use routing::{HandlerFn, HandlerFuture, Route, Router, handler, match_path};
pub use status::HttpStatus;
