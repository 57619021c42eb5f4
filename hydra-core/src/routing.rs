// Request routing

use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// A route handler function type
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Route definition with handler.
///
/// `path` segments starting with `:` capture a parameter; a final `*name`
/// segment captures the remainder of the path (possibly empty).
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerFn,
}

/// Dispatches requests to the first matching route, then to the fallback.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<HandlerFn>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn get(mut self, path: &str, handler: HandlerFn) -> Self {
        self.add_route(Route {
            method: HttpMethod::GET,
            path: path.to_string(),
            handler,
        });
        self
    }

    /// Handler for requests no route matched.
    pub fn fallback(mut self, handler: HandlerFn) -> Self {
        self.fallback = Some(handler);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub async fn route(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = match_path(&route.path, &request.path) else {
                continue;
            };
            path_matched = true;

            // HEAD is answered by GET handlers; the server strips the body.
            let method_ok = route.method.as_str() == request.method
                || (request.method == "HEAD" && route.method == HttpMethod::GET);
            if !method_ok {
                continue;
            }

            request.path_params = params;
            return (route.handler)(request).await;
        }

        if let Some(fallback) = &self.fallback {
            return fallback(request).await;
        }

        if path_matched {
            return Err(Error::MethodNotAllowed(format!(
                "{} {}",
                request.method, request.path
            )));
        }

        Err(Error::RouteNotFound(format!(
            "{} {}",
            request.method, request.path
        )))
    }
}

/// Match a route pattern against a request path, returning captured
/// parameters on success.
pub fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut params = HashMap::new();

    for (i, pattern_part) in pattern_parts.iter().enumerate() {
        if let Some(rest_name) = pattern_part.strip_prefix('*') {
            if i != pattern_parts.len() - 1 {
                return None;
            }
            let rest = path_parts.get(i..).map(|p| p.join("/")).unwrap_or_default();
            params.insert(rest_name.to_string(), rest);
            return Some(params);
        }

        let path_part = path_parts.get(i)?;
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            params.insert(param_name.to_string(), path_part.to_string());
        } else if pattern_part != path_part {
            return None;
        }
    }

    (pattern_parts.len() == path_parts.len()).then_some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok, block_on};

    fn text(body: &'static str) -> HandlerFn {
        handler(move |_req| async move { Ok(HttpResponse::ok().with_body(body.into())) })
    }

    #[test]
    fn test_match_path_static() {
        assert!(match_path("/users", "/users").is_some());
        assert!(match_path("/users", "/users/").is_some());
        assert!(match_path("/users", "/posts").is_none());
        assert!(match_path("/", "/").is_some());
        assert!(match_path("/", "/about").is_none());
    }

    #[test]
    fn test_match_path_params() {
        let params = match_path("/users/:id", "/users/42").unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));
        assert!(match_path("/users/:id", "/users").is_none());
    }

    #[test]
    fn test_match_path_wildcard() {
        let params = match_path("/static/*file", "/static/js/app.1.js").unwrap();
        assert_eq!(params.get("file"), Some(&"js/app.1.js".to_string()));

        let params = match_path("/static/*file", "/static").unwrap();
        assert_eq!(params.get("file"), Some(&String::new()));

        assert!(match_path("/*rest/tail", "/a/tail").is_none());
    }

    #[tokio::test]
    async fn test_router_dispatch_and_fallback() {
        let router = Router::new()
            .get("/health", text("healthy"))
            .fallback(text("page"));

        let res = router.route(HttpRequest::get("/health")).await.unwrap();
        assert_eq!(res.body_str(), "healthy");

        let res = router.route(HttpRequest::get("/anything")).await.unwrap();
        assert_eq!(res.body_str(), "page");
    }

    #[test]
    fn test_router_not_found_and_method_not_allowed() {
        let router = Router::new().get("/health", text("healthy"));

        let err = assert_err!(block_on(router.route(HttpRequest::get("/missing"))));
        assert_eq!(err.status_code(), 404);

        let err = assert_err!(block_on(router.route(HttpRequest::new("POST", "/health"))));
        assert_eq!(err.status_code(), 405);
    }

    #[test]
    fn test_head_uses_get_handler() {
        let router = Router::new().get("/health", text("healthy"));
        let res = assert_ok!(block_on(router.route(HttpRequest::new("HEAD", "/health"))));
        assert_eq!(res.status, 200);
    }
}
