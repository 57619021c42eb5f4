// Server-side rendering of route-matched views

use crate::error::{Result, SsrError};
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, FetchError, run_fetch};
use crate::route::{Resolution, RouteTable};
use crate::view::{DataSource, FetchContext, RenderContext};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Markup and data for one server-rendered path.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Pattern of the route that rendered
    pub route: String,
    pub path: String,
    pub markup: String,
    /// The fetcher's output, embedded in the document for hydration
    pub init_data: Value,
}

/// Result of a render attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(RenderedPage),
    NotFound,
}

impl RenderOutcome {
    pub fn page(self) -> Option<RenderedPage> {
        match self {
            RenderOutcome::Rendered(page) => Some(page),
            RenderOutcome::NotFound => None,
        }
    }
}

/// Resolves a path, runs its fetcher and renders its view.
#[derive(Clone)]
pub struct ServerRenderer {
    routes: Arc<RouteTable>,
    fetch_timeout: Option<Duration>,
}

impl ServerRenderer {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self {
            routes,
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
        }
    }

    /// `None` lets fetches run unbounded.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Render `path`. Unmatched paths return [`RenderOutcome::NotFound`]
    /// without calling any fetcher; partial markup is never returned.
    pub async fn render_for_path(&self, path: &str) -> Result<RenderOutcome> {
        let matched = match self.routes.resolve(path) {
            Resolution::Found(matched) => matched,
            Resolution::NotFound => return Ok(RenderOutcome::NotFound),
        };
        let pattern = matched.pattern().to_string();
        let started = Instant::now();

        let cancel = CancellationToken::new();
        let ctx = FetchContext {
            path: path.to_string(),
            params: matched.params().clone(),
            cancel: cancel.clone(),
        };

        let init_data = run_fetch(matched.route.fetcher().as_ref(), ctx, self.fetch_timeout)
            .await
            .map_err(|err| match err {
                FetchError::TimedOut(timeout) => SsrError::FetchTimeout {
                    route: pattern.clone(),
                    timeout,
                },
                FetchError::Failed(message) => SsrError::FetchFailure {
                    route: pattern.clone(),
                    message,
                },
                FetchError::Cancelled => SsrError::FetchCancelled(pattern.clone()),
            })?;

        let render_ctx = RenderContext::new(init_data, DataSource::Server, path)
            .with_params(matched.params().clone());
        let markup = matched
            .route
            .view()
            .render(&render_ctx)
            .map_err(|e| SsrError::RenderFailure {
                route: pattern.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            path,
            route = %pattern,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered"
        );

        Ok(RenderOutcome::Rendered(RenderedPage {
            route: pattern,
            path: path.to_string(),
            markup,
            init_data: render_ctx.init_data,
        }))
    }

    /// Render several paths concurrently, failing on the first error.
    pub async fn render_many(&self, paths: Vec<String>) -> Result<Vec<(String, RenderOutcome)>> {
        use tokio::task::JoinSet;

        let mut set = JoinSet::new();
        for path in paths {
            let renderer = self.clone();
            set.spawn(async move {
                let outcome = renderer.render_for_path(&path).await?;
                Ok::<_, SsrError>((path, outcome))
            });
        }

        let mut results = Vec::new();
        while let Some(result) = set.join_next().await {
            results.push(result.map_err(|e| SsrError::RenderFailure {
                route: "*".to_string(),
                message: format!("task join error: {}", e),
            })??);
        }

        Ok(results)
    }
}
