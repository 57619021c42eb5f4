//! Basic SSR application with two pages.
//!
//! `/` renders after a simulated one-second data fetch; `/about` fetches
//! immediately. Settings come from `hydra.toml` (optional), `.env` and
//! `HYDRA_*` variables, for example:
//!
//! ```text
//! HYDRA_PORT=8080 HYDRA_MODE=production cargo run --example basic_app
//! ```
//!
//! Without a client build in `build_dir`, a placeholder bundle and manifest
//! are written there so the pages can be served.

use hydra::prelude::*;
use std::path::Path;
use std::time::Duration;

fn index_page() -> RouteDescriptor {
    RouteDescriptor::new(
        "/",
        view_fn(|ctx| {
            Ok(format!(
                "<div class=\"test-css\"><a href=\"/about\">toAbout</a><div>{}</div></div>",
                hydra_react::escape_html(&ctx.field("name"))
            ))
        }),
        fetch_fn(|_ctx| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, BoxError>(json!({ "name": "jack", "age": 18 }))
        }),
    )
    .exact()
}

fn about_page() -> RouteDescriptor {
    RouteDescriptor::new(
        "/about",
        view_fn(|ctx| {
            Ok(format!(
                "<div><h1>{}</h1><a href=\"/\">toIndex</a></div>",
                hydra_react::escape_html(&ctx.field("title"))
            ))
        }),
        static_data(json!({ "title": "About" })),
    )
}

async fn ensure_client_build(build_dir: &Path, manifest_file: &str) -> std::io::Result<()> {
    let manifest = build_dir.join(manifest_file);
    if tokio::fs::try_exists(&manifest).await? {
        return Ok(());
    }

    tracing::warn!(dir = %build_dir.display(), "no client build found, writing a placeholder");
    tokio::fs::create_dir_all(build_dir).await?;
    tokio::fs::write(
        build_dir.join("client-entry.js"),
        "console.log('hydrated', window.__INIT_STATE__);\n",
    )
    .await?;
    tokio::fs::write(&manifest, r#"{"client-entry.js": "/client-entry.js"}"#).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::from_env().format(LogFormat::Pretty).init();

    let config = ConfigManager::builder()
        .optional_file("hydra.toml")
        .dotenv()
        .env()
        .build()?;
    let settings = config.settings()?;

    ensure_client_build(&settings.build_dir, &settings.manifest_file).await?;

    let routes = RouteTable::builder()
        .route(index_page())
        .route(about_page())
        .build()?;

    let service = ReactService::new(ReactConfig::from_settings(&settings), routes);
    if let Err(err) = service.health_check().await {
        tracing::warn!(error = %err, "client build is not usable yet");
    }

    tracing::info!(
        addr = %settings.bind_address(),
        mode = ?settings.mode,
        "starting basic_app"
    );

    Application::new(service.into_router())
        .listen(&settings.bind_address())
        .await?;

    Ok(())
}
