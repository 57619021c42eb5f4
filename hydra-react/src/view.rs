// View and data-fetcher capabilities

use crate::error::BoxError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where a view's `init_data` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fetched during SSR, or the server-injected state reused while hydrating
    Server,
    /// Fetched on the client after a navigation
    Client,
}

/// Everything a view receives when rendering.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub init_data: Value,
    pub source: DataSource,
    /// URL path being rendered
    pub path: String,
    pub params: HashMap<String, String>,
    /// Set when the last client-side fetch failed
    pub error: Option<String>,
}

impl RenderContext {
    pub fn new(init_data: Value, source: DataSource, path: impl Into<String>) -> Self {
        Self {
            init_data,
            source,
            path: path.into(),
            params: HashMap::new(),
            error: None,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Top-level field of `init_data` rendered as display text; strings are
    /// unquoted, missing fields are empty.
    pub fn field(&self, key: &str) -> String {
        match self.init_data.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// A renderable view: turns a context into markup.
pub trait View: Send + Sync {
    fn render(&self, ctx: &RenderContext) -> Result<String, BoxError>;
}

/// Input handed to a [`DataFetcher`].
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub path: String,
    pub params: HashMap<String, String>,
    /// Cancelled when the result is no longer wanted (timeout, unmount,
    /// superseding navigation). Long-running fetchers should watch it.
    pub cancel: CancellationToken,
}

/// Produces a route's initial data.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, ctx: FetchContext) -> Result<Value, BoxError>;
}

// ============================================================================
// Closure adapters
// ============================================================================

struct FnView<F>(F);

impl<F> View for FnView<F>
where
    F: Fn(&RenderContext) -> Result<String, BoxError> + Send + Sync,
{
    fn render(&self, ctx: &RenderContext) -> Result<String, BoxError> {
        (self.0)(ctx)
    }
}

/// Build a view from a closure.
pub fn view_fn<F>(f: F) -> Arc<dyn View>
where
    F: Fn(&RenderContext) -> Result<String, BoxError> + Send + Sync + 'static,
{
    Arc::new(FnView(f))
}

struct FnFetcher<F>(F);

#[async_trait]
impl<F, Fut> DataFetcher for FnFetcher<F>
where
    F: Fn(FetchContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn fetch(&self, ctx: FetchContext) -> Result<Value, BoxError> {
        (self.0)(ctx).await
    }
}

/// Build a fetcher from an async closure.
pub fn fetch_fn<F, Fut>(f: F) -> Arc<dyn DataFetcher>
where
    F: Fn(FetchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    Arc::new(FnFetcher(f))
}

struct StaticData(Value);

#[async_trait]
impl DataFetcher for StaticData {
    async fn fetch(&self, _ctx: FetchContext) -> Result<Value, BoxError> {
        Ok(self.0.clone())
    }
}

/// Fetcher that always resolves to `value`.
pub fn static_data(value: Value) -> Arc<dyn DataFetcher> {
    Arc::new(StaticData(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_display() {
        let ctx = RenderContext::new(json!({"name": "jack", "age": 18}), DataSource::Server, "/");
        assert_eq!(ctx.field("name"), "jack");
        assert_eq!(ctx.field("age"), "18");
        assert_eq!(ctx.field("missing"), "");
    }

    #[test]
    fn test_view_fn_renders() {
        let view = view_fn(|ctx| Ok(format!("<h1>{}</h1>", ctx.field("title"))));
        let ctx = RenderContext::new(json!({"title": "About"}), DataSource::Client, "/about");
        assert_eq!(view.render(&ctx).unwrap(), "<h1>About</h1>");
    }

    #[tokio::test]
    async fn test_fetch_fn_receives_params() {
        let fetcher = fetch_fn(|ctx: FetchContext| async move {
            Ok::<_, BoxError>(json!({ "id": ctx.params.get("id").cloned() }))
        });

        let mut params = HashMap::new();
        params.insert("id".to_string(), "7".to_string());
        let ctx = FetchContext {
            path: "/users/7".to_string(),
            params,
            cancel: CancellationToken::new(),
        };

        assert_eq!(fetcher.fetch(ctx).await.unwrap(), json!({"id": "7"}));
    }

    #[tokio::test]
    async fn test_static_data() {
        let fetcher = static_data(json!([1, 2]));
        let ctx = FetchContext {
            path: "/".to_string(),
            params: HashMap::new(),
            cancel: CancellationToken::new(),
        };
        assert_eq!(fetcher.fetch(ctx).await.unwrap(), json!([1, 2]));
    }
}
