// Hydra - server-side rendering with client hydration for Rust
//
// Facade over the workspace crates: the HTTP layer, layered configuration,
// logging setup and the SSR/hydration pipeline.

// Re-export core functionality
pub use hydra_core::*;

pub use hydra_config;
pub use hydra_log;
pub use hydra_react;

pub mod prelude {
    pub use hydra_config::{ConfigManager, Mode, ServerSettings, Validate};
    pub use hydra_core::{
        Application, Error, HttpRequest, HttpResponse, HttpStatus, Router, handler,
    };
    pub use hydra_log::{LogConfig, LogFormat, LogLevel};
    pub use hydra_react::{
        BoxError, DataFetcher, DataSource, FetchContext, PageLoadContext, ReactConfig,
        ReactService, RenderContext, RouteDescriptor, RouteTable, ServerRenderer, View,
        ViewPhase, ViewWrapper, fetch_fn, static_data, view_fn,
    };

    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
