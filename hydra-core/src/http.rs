// HTTP request and response types

use crate::{Error, HttpStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP methods the router dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "HEAD" => Some(HttpMethod::HEAD),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Build a request from a method and a request target. A query string
    /// in `target` is split off and decoded into `query_params`.
    pub fn new(method: impl Into<String>, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        Self {
            method: method.into(),
            path: path.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
            path_params: HashMap::new(),
            query_params: query.map(parse_query_string).unwrap_or_default(),
        }
    }

    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new("GET", target)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::BadRequest(e.to_string()))
    }

    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_status(status: HttpStatus) -> Self {
        Self::new(status.code())
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// `200 OK` with an HTML body.
    pub fn html(body: impl Into<String>) -> Self {
        Self::ok().with_html(body)
    }

    pub fn with_html(self, body: impl Into<String>) -> Self {
        self.content_type("text/html; charset=utf-8")
            .with_body(body.into().into_bytes())
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.with_header("Content-Type", value)
    }

    pub fn cache_control(self, value: impl Into<String>) -> Self {
        self.with_header("Cache-Control", value)
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// JSON error body used for failures outside SSR pages.
    pub fn from_error(err: &Error) -> Self {
        let status = err.status_code();
        let body = serde_json::json!({
            "error": err.to_string(),
            "status": status,
        });
        // Serializing a `json!` literal cannot fail.
        HttpResponse::new(status)
            .with_json(&body)
            .unwrap_or_else(|_| HttpResponse::new(status))
    }
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let req = HttpRequest::get("/about?tab=team&q=a+b%21");
        assert_eq!(req.path, "/about");
        assert_eq!(req.query("tab"), Some(&"team".to_string()));
        assert_eq!(req.query("q"), Some(&"a b!".to_string()));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = HttpRequest::get("/").with_header("Accept", "text/html");
        assert_eq!(req.header("accept"), Some(&"text/html".to_string()));
        assert_eq!(req.header("ACCEPT"), Some(&"text/html".to_string()));
    }

    #[test]
    fn test_html_response() {
        let res = HttpResponse::html("<p>hi</p>");
        assert_eq!(res.status, 200);
        assert_eq!(
            res.headers.get("Content-Type"),
            Some(&"text/html; charset=utf-8".to_string())
        );
        assert_eq!(res.body_str(), "<p>hi</p>");
    }

    #[test]
    fn test_error_response_is_json() {
        let res = HttpResponse::from_error(&Error::RouteNotFound("GET /nope".into()));
        assert_eq!(res.status, 404);
        let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(body["status"], 404);
        assert!(body["error"].as_str().unwrap().contains("/nope"));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::parse("BREW"), None);
        assert_eq!(HttpMethod::HEAD.as_str(), "HEAD");
    }
}
