//! Server-side rendering and client hydration for route-matched views.
//!
//! A [`RouteTable`] maps URL patterns to a [`View`] and the [`DataFetcher`]
//! producing its data. On the server, [`ServerRenderer`] resolves a path,
//! fetches under a timeout and renders markup; [`ReactService`] wraps that
//! markup in a document that loads the client bundle named by the build's
//! asset manifest and embeds the fetched data as `window.__INIT_STATE__`.
//! On the client, a [`ViewWrapper`] reuses that state exactly once, for the
//! route the server rendered, and fetches for every other mount.
//!
//! ## Features
//!
//! - ⚛️ **SSR** - Route resolution, bounded data fetching, document assembly
//! - 💧 **Hydration** - Single-use server state, scoped to the rendered route
//! - 📦 **Static Assets** - Hashed client bundles with mode-aware caching
//! - 🗂️ **Pre-rendering** - Write routes to static HTML files
//!
//! ## Quick Start
//!
//! ```
//! use hydra_react::{RouteDescriptor, RouteTable, static_data, view_fn};
//! use serde_json::json;
//!
//! let routes = RouteTable::builder()
//!     .route(
//!         RouteDescriptor::new(
//!             "/",
//!             view_fn(|ctx| Ok(format!("<h1>Hello {}</h1>", ctx.field("name")))),
//!             static_data(json!({"name": "jack"})),
//!         )
//!         .exact(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(routes.resolve("/").is_found());
//! assert!(!routes.resolve("/nonexistent").is_found());
//! ```
//!
//! ## Configuration
//!
//! ```
//! use hydra_config::Mode;
//! use hydra_react::ReactConfig;
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! let config = ReactConfig::new(PathBuf::from("dist/client"))
//!     .with_mode(Mode::Production)
//!     .with_fetch_timeout(Duration::from_secs(2))
//!     .with_title("My App");
//!
//! assert_eq!(config.manifest_path(), PathBuf::from("dist/client/manifest.json"));
//! assert!(!config.is_development());
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use hydra_core::Application;
//! use hydra_react::{ReactConfig, ReactService, RouteTable};
//! use std::path::PathBuf;
//!
//! # async fn run(routes: RouteTable) -> Result<(), hydra_core::Error> {
//! let service = ReactService::new(ReactConfig::new(PathBuf::from("dist/client")), routes);
//! Application::new(service.into_router())
//!     .listen("127.0.0.1:3000")
//!     .await
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod hydration;
pub mod manifest;
pub mod renderer;
pub mod route;
pub mod service;
pub mod static_files;
pub mod view;

pub use config::ReactConfig;
pub use document::{Document, error_page, escape_html, serialize_state};
pub use error::{BoxError, Result, SsrError};
pub use fetch::{DEFAULT_FETCH_TIMEOUT, FetchError, run_fetch};
pub use hydration::{PageLoadContext, ViewPhase, ViewSnapshot, ViewWrapper};
pub use manifest::{AssetManifest, ManifestSource};
pub use renderer::{RenderOutcome, RenderedPage, ServerRenderer};
pub use route::{
    PathMatch, Resolution, RouteDescriptor, RouteMatch, RouteTable, RouteTableBuilder,
    match_pattern, normalize_path,
};
pub use service::{PrerenderStats, ReactService};
pub use static_files::StaticFileService;
pub use view::{
    DataFetcher, DataSource, FetchContext, RenderContext, View, fetch_fn, static_data, view_fn,
};
