// React SSR Service

use crate::config::ReactConfig;
use crate::document::{Document, error_page};
use crate::error::{Result, SsrError};
use crate::manifest::ManifestSource;
use crate::renderer::{RenderOutcome, RenderedPage, ServerRenderer};
use crate::route::RouteTable;
use crate::static_files::StaticFileService;
use hydra_core::{Error, HttpRequest, HttpResponse, HttpStatus, Router, handler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Statistics from [`ReactService::pre_render_site`].
#[derive(Debug, Clone)]
pub struct PrerenderStats {
    pub pages_rendered: usize,
    /// Paths no route matched
    pub skipped: Vec<String>,
    pub duration: Duration,
    pub pages_per_second: f64,
}

/// React SSR Service: turns requests into documents, static assets or error
/// pages.
#[derive(Clone)]
pub struct ReactService {
    config: ReactConfig,
    renderer: ServerRenderer,
    manifest: ManifestSource,
    static_files: StaticFileService,
}

impl ReactService {
    /// Create a new React service. In development the manifest is re-read on
    /// every render; in production it is read once.
    pub fn new(config: ReactConfig, routes: RouteTable) -> Self {
        let renderer =
            ServerRenderer::new(Arc::new(routes)).with_fetch_timeout(Some(config.fetch_timeout));
        let manifest = ManifestSource::from_path(config.manifest_path(), config.is_development());
        let static_files = StaticFileService::new(config.build_dir.clone(), config.is_development());

        tracing::info!(
            build_dir = %config.build_dir.display(),
            mode = ?config.mode,
            routes = renderer.routes().len(),
            "react service configured"
        );

        Self {
            config,
            renderer,
            manifest,
            static_files,
        }
    }

    /// Replace the manifest source
    pub fn with_manifest(mut self, manifest: ManifestSource) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn config(&self) -> &ReactConfig {
        &self.config
    }

    pub fn renderer(&self) -> &ServerRenderer {
        &self.renderer
    }

    /// Render `path` to a full document. `Ok(None)` when no route matches.
    pub async fn render_document(&self, path: &str) -> Result<Option<String>> {
        match self.renderer.render_for_path(path).await? {
            RenderOutcome::Rendered(page) => self.document(&page).await.map(Some),
            RenderOutcome::NotFound => Ok(None),
        }
    }

    /// Render a React page for the given request. Always produces a response
    /// with a body: 200 with the document, 404 for unmatched paths, 500 for
    /// fetch, render and manifest failures.
    pub async fn render(&self, req: &HttpRequest) -> HttpResponse {
        let err = match self.render_document(&req.path).await {
            Ok(Some(html)) => return HttpResponse::html(html),
            Ok(None) => {
                let err = SsrError::RouteNotFound(req.path.clone());
                tracing::debug!(error = %err, "no route for path");
                err
            }
            Err(err) => {
                tracing::error!(path = %req.path, error = %err, "server render failed");
                err
            }
        };

        let status = err.status();
        let message = match &err {
            SsrError::RouteNotFound(_) => err.to_string(),
            _ => "The page could not be rendered.".to_string(),
        };
        HttpResponse::with_status(status)
            .with_html(error_page(status, &message, &self.config.title))
    }

    /// Serve static files
    pub async fn serve_static(&self, path: &str) -> std::result::Result<HttpResponse, Error> {
        let relative = self.static_relative(path).unwrap_or(path);
        let content = self.static_files.serve(relative).await?;

        Ok(HttpResponse::ok()
            .content_type(self.static_files.content_type(relative))
            .cache_control(self.static_files.cache_control(relative))
            .with_body(content))
    }

    /// Whether `path` goes through SSR rather than the static file service.
    ///
    /// Under the default `/` prefix a final segment with an extension is
    /// taken for an asset (`.html` excepted). [`handle`](Self::handle) still
    /// renders such a path when no file exists and a route matches it, so
    /// `/users/john.doe` reaches `/users/:id`.
    pub fn should_render(&self, path: &str) -> bool {
        let Some(relative) = self.static_relative(path) else {
            return true;
        };
        if self.serves_from_root() {
            let name = relative.rsplit('/').next().unwrap_or(relative);
            !name.contains('.') || name.ends_with(".html")
        } else {
            false
        }
    }

    /// Dispatch one request.
    pub async fn handle(&self, req: HttpRequest) -> std::result::Result<HttpResponse, Error> {
        if req.method != "GET" && req.method != "HEAD" {
            return Err(Error::MethodNotAllowed(format!("{} {}", req.method, req.path)));
        }

        if self.should_render(&req.path) {
            return Ok(self.render(&req).await);
        }

        match self.serve_static(&req.path).await {
            Err(Error::NotFound(_))
                if self.serves_from_root() && self.renderer.routes().resolve(&req.path).is_found() =>
            {
                tracing::debug!(path = %req.path, "no static file, rendering matched route");
                Ok(self.render(&req).await)
            }
            served => served,
        }
    }

    /// Check service health: the manifest must be readable and name the
    /// client entry script.
    pub async fn health_check(&self) -> Result<()> {
        let manifest = self.manifest.current().await?;
        manifest.entry_script(&self.config.client_entry)?;
        Ok(())
    }

    /// Router with `GET /health` and every other request going to
    /// [`handle`](Self::handle).
    pub fn into_router(self) -> Router {
        let service = Arc::new(self);
        let health = service.clone();

        Router::new()
            .get(
                "/health",
                handler(move |_req| {
                    let service = health.clone();
                    async move {
                        match service.health_check().await {
                            Ok(()) => HttpResponse::ok().with_json(&serde_json::json!({
                                "status": "healthy"
                            })),
                            Err(err) => {
                                tracing::warn!(error = %err, "health check failed");
                                HttpResponse::with_status(HttpStatus::ServiceUnavailable)
                                    .with_json(&serde_json::json!({
                                        "status": "unhealthy",
                                        "error": err.to_string(),
                                    }))
                            }
                        }
                    }
                }),
            )
            .fallback(handler(move |req| {
                let service = service.clone();
                async move { service.handle(req).await }
            }))
    }

    /// Pre-render `paths` into `output_dir` as `index.html` / `<path>.html`.
    /// Paths no route matches are skipped.
    pub async fn pre_render_site(
        &self,
        output_dir: &Path,
        paths: Vec<String>,
    ) -> Result<PrerenderStats> {
        use tokio::task::JoinSet;

        let start = Instant::now();
        tracing::info!(count = paths.len(), "pre-rendering routes");

        let rendered = self.renderer.render_many(paths).await?;

        let mut skipped = Vec::new();
        let mut set = JoinSet::new();
        for (path, outcome) in rendered {
            let page = match outcome {
                RenderOutcome::Rendered(page) => page,
                RenderOutcome::NotFound => {
                    tracing::warn!(path = %path, "no route for path, skipping");
                    skipped.push(path);
                    continue;
                }
            };

            let html = self.document(&page).await?;
            let file_path = output_file(output_dir, &path)?;

            set.spawn(async move {
                if let Some(parent) = file_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&file_path, html).await?;
                Ok::<_, SsrError>(file_path)
            });
        }

        let mut written = 0;
        while let Some(result) = set.join_next().await {
            let file = result.map_err(|e| SsrError::RenderFailure {
                route: "*".to_string(),
                message: format!("task join error: {}", e),
            })??;
            tracing::debug!(file = %file.display(), "page written");
            written += 1;
        }

        let duration = start.elapsed();
        let pages_per_second = written as f64 / duration.as_secs_f64().max(f64::EPSILON);
        tracing::info!(pages = written, skipped = skipped.len(), ?duration, "pre-render complete");

        Ok(PrerenderStats {
            pages_rendered: written,
            skipped,
            duration,
            pages_per_second,
        })
    }

    async fn document(&self, page: &RenderedPage) -> Result<String> {
        let manifest = self.manifest.current().await?;
        let entry = &self.config.client_entry;

        Document::new(
            &self.config.title,
            &self.config.mount_id,
            &self.config.state_global,
        )
        .stylesheet(manifest.entry_stylesheet(entry))
        .script(manifest.entry_script(entry)?)
        .render(&page.markup, &page.init_data)
    }

    fn serves_from_root(&self) -> bool {
        self.config.static_prefix.trim_end_matches('/').is_empty()
    }

    /// `path` relative to the static prefix, if it lies under it.
    fn static_relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.serves_from_root() {
            return Some(path);
        }
        let prefix = self.config.static_prefix.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

fn output_file(output_dir: &Path, path: &str) -> Result<PathBuf> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(output_dir.join("index.html"));
    }
    if trimmed.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(SsrError::InvalidPath(path.to_string()));
    }
    Ok(output_dir.join(format!("{}.html", trimmed)))
}
