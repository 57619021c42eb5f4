// Client-side hydration and view lifecycle

use crate::error::{Result, SsrError};
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, FetchError, run_fetch};
use crate::route::{RouteMatch, RouteTable, normalize_path};
use crate::view::{DataSource, FetchContext, RenderContext};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The route and concrete path the server rendered for this page load.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderedRoute {
    index: usize,
    pattern: String,
    path: String,
}

/// Per-page-load hydration state: the state the server injected and the
/// route it rendered. Exactly one mount of that route, at that path, may take
/// the state; every other mount fetches its own data.
#[derive(Debug)]
pub struct PageLoadContext {
    server_path: String,
    rendered: Option<RenderedRoute>,
    state: Option<Value>,
    claimed: AtomicBool,
}

impl PageLoadContext {
    /// Resolve `server_path` against the client's copy of the route table.
    /// A path no route matches leaves the state unclaimable.
    pub fn new(routes: &RouteTable, server_path: impl Into<String>, state: Option<Value>) -> Self {
        let server_path = server_path.into();
        let rendered = routes.resolve(&server_path).found().map(|m| RenderedRoute {
            index: m.index,
            pattern: m.pattern().to_string(),
            path: normalize_path(&server_path),
        });

        Self {
            server_path,
            rendered,
            state,
            claimed: AtomicBool::new(false),
        }
    }

    /// Read the state back out of a server-rendered document. A document
    /// without the assignment yields a context with no state.
    pub fn from_html(
        html: &str,
        state_global: &str,
        routes: &RouteTable,
        server_path: impl Into<String>,
    ) -> Result<Self> {
        let marker = format!("window.{}=", state_global);
        let state = match html.find(&marker) {
            Some(start) => {
                let rest = &html[start + marker.len()..];
                let end = rest.find("</script>").unwrap_or(rest.len());
                Some(serde_json::from_str(rest[..end].trim())?)
            }
            None => None,
        };
        Ok(Self::new(routes, server_path, state))
    }

    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    /// Pattern of the route the server rendered, if the path resolved.
    pub fn rendered_pattern(&self) -> Option<&str> {
        self.rendered.as_ref().map(|r| r.pattern.as_str())
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Take the server state for `matched`, if it is the route and path the
    /// server rendered and nobody has taken it yet.
    pub fn claim(&self, matched: &RouteMatch) -> Option<Value> {
        let state = self.state.as_ref()?;
        let rendered = self.rendered.as_ref()?;

        if matched.index != rendered.index
            || matched.pattern() != rendered.pattern
            || normalize_path(&matched.path) != rendered.path
        {
            tracing::debug!(
                route = %matched.pattern(),
                path = %matched.path,
                server_path = %self.server_path,
                "server state belongs to another page"
            );
            return None;
        }

        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| state.clone())
    }
}

/// Lifecycle phase of a mounted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Holding server-injected data; no fetch
    Hydrating,
    /// Fetch pending or in flight
    Fetching,
    Ready,
    /// Last fetch failed
    Failed,
    Unmounted,
}

/// Point-in-time view of a wrapper's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub phase: ViewPhase,
    pub data: Option<Value>,
    pub source: Option<DataSource>,
    pub error: Option<String>,
    pub generation: u64,
    pub fetches_started: usize,
}

struct WrapperState {
    phase: ViewPhase,
    data: Option<Value>,
    source: Option<DataSource>,
    error: Option<String>,
    generation: u64,
    fetches_started: usize,
    current: RouteMatch,
    in_flight: Option<CancellationToken>,
}

/// Wraps a routed view on the client: hydrates from server state when it
/// may, otherwise fetches, and keeps late or superseded results out.
pub struct ViewWrapper {
    state: Arc<Mutex<WrapperState>>,
    root: CancellationToken,
    fetch_timeout: Option<Duration>,
}

impl ViewWrapper {
    pub fn new(ctx: &PageLoadContext, matched: RouteMatch) -> Self {
        let (phase, data, source) = match ctx.claim(&matched) {
            Some(state) => (ViewPhase::Hydrating, Some(state), Some(DataSource::Server)),
            None => (ViewPhase::Fetching, None, None),
        };

        tracing::debug!(route = %matched.pattern(), ?phase, "view constructed");

        Self {
            state: Arc::new(Mutex::new(WrapperState {
                phase,
                data,
                source,
                error: None,
                generation: 0,
                fetches_started: 0,
                current: matched,
                in_flight: None,
            })),
            root: CancellationToken::new(),
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
        }
    }

    /// Bound client fetches; `None` lets them run until cancelled.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    /// First mount. A hydrating view becomes ready without fetching; any
    /// other view starts its fetch. Returns the fetch task, if one started.
    pub fn did_mount(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock();
        let phase = state.phase;
        match phase {
            ViewPhase::Hydrating => {
                state.phase = ViewPhase::Ready;
                None
            }
            ViewPhase::Fetching if state.in_flight.is_none() => Some(self.start_fetch(&mut state)),
            _ => None,
        }
    }

    /// Re-fetch for the current route, superseding any fetch in flight.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock();
        if state.phase == ViewPhase::Unmounted {
            return None;
        }
        Some(self.start_fetch(&mut state))
    }

    /// Client-side navigation to another match of the same view.
    pub fn navigate(&self, matched: RouteMatch) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock();
        if state.phase == ViewPhase::Unmounted {
            return None;
        }
        state.current = matched;
        Some(self.start_fetch(&mut state))
    }

    /// Cancel any fetch and stop accepting results.
    pub fn unmount(&self) {
        let mut state = self.state.lock();
        state.phase = ViewPhase::Unmounted;
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
        self.root.cancel();
        tracing::debug!(route = %state.current.pattern(), "view unmounted");
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state.lock();
        ViewSnapshot {
            phase: state.phase,
            data: state.data.clone(),
            source: state.source,
            error: state.error.clone(),
            generation: state.generation,
            fetches_started: state.fetches_started,
        }
    }

    /// Render with the current data. `Ok(None)` while there is nothing to
    /// show (no data yet, or unmounted).
    pub fn render(&self) -> Result<Option<String>> {
        let (view, ctx, pattern) = {
            let state = self.state.lock();
            let Some(data) = state.data.clone() else {
                return Ok(None);
            };
            if state.phase == ViewPhase::Unmounted {
                return Ok(None);
            }
            let ctx = RenderContext::new(
                data,
                state.source.unwrap_or(DataSource::Client),
                state.current.path.clone(),
            )
            .with_params(state.current.params().clone())
            .with_error(state.error.clone());
            (
                state.current.route.view().clone(),
                ctx,
                state.current.pattern().to_string(),
            )
        };

        view.render(&ctx)
            .map(Some)
            .map_err(|e| SsrError::RenderFailure {
                route: pattern,
                message: e.to_string(),
            })
    }

    fn start_fetch(&self, state: &mut WrapperState) -> JoinHandle<()> {
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }

        state.generation += 1;
        state.fetches_started += 1;
        state.phase = ViewPhase::Fetching;
        state.error = None;

        let generation = state.generation;
        let token = self.root.child_token();
        state.in_flight = Some(token.clone());

        let fetcher = state.current.route.fetcher().clone();
        let ctx = FetchContext {
            path: state.current.path.clone(),
            params: state.current.params().clone(),
            cancel: token,
        };
        let timeout = self.fetch_timeout;
        let shared = self.state.clone();

        tracing::debug!(route = %state.current.pattern(), generation, "client fetch started");

        tokio::spawn(async move {
            let result = run_fetch(fetcher.as_ref(), ctx, timeout).await;

            let mut state = shared.lock();
            if state.phase == ViewPhase::Unmounted || state.generation != generation {
                tracing::debug!(generation, current = state.generation, "stale fetch result discarded");
                return;
            }

            state.in_flight = None;
            match result {
                Ok(data) => {
                    state.data = Some(data);
                    state.source = Some(DataSource::Client);
                    state.phase = ViewPhase::Ready;
                }
                Err(FetchError::Cancelled) => {}
                Err(err) => {
                    tracing::warn!(route = %state.current.pattern(), error = %err, "client fetch failed");
                    state.error = Some(err.to_string());
                    state.phase = ViewPhase::Failed;
                }
            }
        })
    }
}

impl Drop for ViewWrapper {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::route::{RouteDescriptor, RouteTable};
    use crate::view::{fetch_fn, static_data, view_fn};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteDescriptor::new(
                "/",
                view_fn(|ctx| Ok(format!("hello {}", ctx.field("name")))),
                static_data(json!({"name": "client"})),
            )
            .exact(),
            RouteDescriptor::new(
                "/about",
                view_fn(|_| Ok("about".into())),
                static_data(json!({"page": "about"})),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_claim_only_once() {
        let routes = table();
        let ctx = PageLoadContext::new(&routes, "/", Some(json!({"name": "server"})));
        let home = routes.resolve("/").found().unwrap();

        assert_eq!(ctx.claim(&home), Some(json!({"name": "server"})));
        assert!(ctx.is_claimed());
        assert_eq!(ctx.claim(&home), None);
    }

    #[test]
    fn test_claim_requires_rendered_route() {
        let routes = table();
        let ctx = PageLoadContext::new(&routes, "/", Some(json!({})));
        let about = routes.resolve("/about").found().unwrap();

        assert_eq!(ctx.rendered_pattern(), Some("/"));
        assert_eq!(ctx.claim(&about), None);
        assert!(!ctx.is_claimed());
    }

    #[test]
    fn test_claim_requires_rendered_path() {
        let routes = RouteTable::new(vec![RouteDescriptor::new(
            "/users/:id",
            view_fn(|ctx| Ok(ctx.field("name"))),
            static_data(json!({"name": "client"})),
        )])
        .unwrap();
        let ctx = PageLoadContext::new(&routes, "/users/1", Some(json!({"name": "user-1"})));

        let other_user = ViewWrapper::new(&ctx, routes.resolve("/users/2").found().unwrap());
        let snap = other_user.snapshot();
        assert_eq!(snap.phase, ViewPhase::Fetching);
        assert_eq!(snap.data, None);
        assert!(!ctx.is_claimed());

        let same_user = ViewWrapper::new(&ctx, routes.resolve("/users/1/?tab=posts").found().unwrap());
        assert_eq!(same_user.snapshot().phase, ViewPhase::Hydrating);
        assert_eq!(same_user.snapshot().data, Some(json!({"name": "user-1"})));
    }

    #[test]
    fn test_later_prefix_route_never_claims() {
        let routes = RouteTable::new(vec![
            RouteDescriptor::new(
                "/about",
                view_fn(|_| Ok("about".into())),
                static_data(json!({"t": "about-client"})),
            ),
            RouteDescriptor::new(
                "/",
                view_fn(|_| Ok("home".into())),
                static_data(json!({"t": "home-client"})),
            ),
        ])
        .unwrap();
        let ctx = PageLoadContext::new(&routes, "/about", Some(json!({"t": "about-server"})));

        let home = ViewWrapper::new(&ctx, routes.resolve("/").found().unwrap());
        assert_eq!(home.snapshot().phase, ViewPhase::Fetching);
        assert_eq!(home.snapshot().data, None);
        assert!(!ctx.is_claimed());

        let about = routes.resolve("/about").found().unwrap();
        assert_eq!(ctx.claim(&about), Some(json!({"t": "about-server"})));
    }

    #[test]
    fn test_unresolved_server_path_is_unclaimable() {
        let routes = table();
        let ctx = PageLoadContext::new(&routes, "/nowhere/else", Some(json!({})));
        assert_eq!(ctx.rendered_pattern(), None);
        let home = routes.resolve("/").found().unwrap();
        assert_eq!(ctx.claim(&home), None);
    }

    #[test]
    fn test_from_html() {
        let html = "<div id=\"app\"></div><script>window.__INIT_STATE__={\"a\":\"\\u003c\"}</script>";
        let routes = table();
        let ctx = PageLoadContext::from_html(html, "__INIT_STATE__", &routes, "/").unwrap();
        let home = routes.resolve("/").found().unwrap();
        assert_eq!(ctx.claim(&home), Some(json!({"a": "<"})));

        let empty = PageLoadContext::from_html("<html></html>", "__INIT_STATE__", &routes, "/").unwrap();
        assert_eq!(empty.claim(&home), None);
    }

    #[tokio::test]
    async fn test_hydrate_then_ready() {
        let routes = table();
        let ctx = PageLoadContext::new(&routes, "/", Some(json!({"name": "server"})));
        let wrapper = ViewWrapper::new(&ctx, routes.resolve("/").found().unwrap());

        assert_eq!(wrapper.snapshot().phase, ViewPhase::Hydrating);
        assert!(wrapper.did_mount().is_none());

        let snap = wrapper.snapshot();
        assert_eq!(snap.phase, ViewPhase::Ready);
        assert_eq!(snap.fetches_started, 0);
        assert_eq!(snap.source, Some(DataSource::Server));
        assert_eq!(wrapper.render().unwrap().as_deref(), Some("hello server"));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_visible() {
        let routes = RouteTable::new(vec![RouteDescriptor::new(
            "/",
            view_fn(|ctx| Ok(ctx.error.clone().unwrap_or_default())),
            fetch_fn(|_| async { Err::<Value, BoxError>("offline".into()) }),
        )])
        .unwrap();
        let ctx = PageLoadContext::new(&routes, "/other", None);
        let wrapper = ViewWrapper::new(&ctx, routes.resolve("/").found().unwrap());

        wrapper.did_mount().unwrap().await.unwrap();

        let snap = wrapper.snapshot();
        assert_eq!(snap.phase, ViewPhase::Failed);
        assert_eq!(snap.error.as_deref(), Some("offline"));
        assert_eq!(snap.data, None);
    }

    #[tokio::test]
    async fn test_navigate_refetches_with_params() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let routes = RouteTable::new(vec![RouteDescriptor::new(
            "/users/:id",
            view_fn(|ctx| Ok(ctx.field("id"))),
            fetch_fn(move |ctx: FetchContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, BoxError>(json!({ "id": ctx.params.get("id").cloned() })) }
            }),
        )])
        .unwrap();
        let ctx = PageLoadContext::new(&routes, "/", None);
        let wrapper = ViewWrapper::new(&ctx, routes.resolve("/users/1").found().unwrap());

        wrapper.did_mount().unwrap().await.unwrap();
        assert_eq!(wrapper.render().unwrap().as_deref(), Some("1"));

        wrapper
            .navigate(routes.resolve("/users/2").found().unwrap())
            .unwrap()
            .await
            .unwrap();
        assert_eq!(wrapper.render().unwrap().as_deref(), Some("2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(wrapper.snapshot().generation, 2);
    }

    #[tokio::test]
    async fn test_no_fetch_after_unmount() {
        let routes = table();
        let ctx = PageLoadContext::new(&routes, "/", None);
        let wrapper = ViewWrapper::new(&ctx, routes.resolve("/about").found().unwrap());

        wrapper.unmount();
        assert!(wrapper.did_mount().is_none());
        assert!(wrapper.refresh().is_none());
        assert_eq!(wrapper.snapshot().phase, ViewPhase::Unmounted);
        assert_eq!(wrapper.render().unwrap(), None);
    }

    #[tokio::test]
    async fn test_hung_client_fetch_times_out() {
        let routes = RouteTable::new(vec![RouteDescriptor::new(
            "/",
            view_fn(|_| Ok(String::new())),
            fetch_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, BoxError>(json!(null))
            }),
        )])
        .unwrap();
        let ctx = PageLoadContext::new(&routes, "/", None);

        let defaulted = ViewWrapper::new(&ctx, routes.resolve("/").found().unwrap());
        assert_eq!(defaulted.fetch_timeout(), Some(DEFAULT_FETCH_TIMEOUT));

        let wrapper = ViewWrapper::new(&ctx, routes.resolve("/").found().unwrap())
            .with_fetch_timeout(Some(Duration::from_millis(30)));
        wrapper.did_mount().unwrap().await.unwrap();

        let snap = wrapper.snapshot();
        assert_eq!(snap.phase, ViewPhase::Failed);
        assert_eq!(snap.error.as_deref(), Some("timed out after 30ms"));
        assert_eq!(snap.data, None);
    }
}
