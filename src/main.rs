use anyhow::{Context, Result};
use call_relay::{create_router, AppState, CloudSynthesizer, Config, Pipeline, PlaybackInjector};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "call-relay", version, about = "Streaming relay between phone calls and dispatchers")]
struct Args {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/call-relay")]
    config: String,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Languages: primary {} (+{} alternatives), target {}",
        cfg.pipeline.primary_language,
        cfg.pipeline.alternative_languages.len(),
        cfg.pipeline.target_language
    );
    info!(
        "Translation {}, dispatcher {}",
        if cfg.pipeline.translation_enabled { "enabled" } else { "disabled" },
        if cfg.pipeline.dispatcher_enabled { "enabled" } else { "disabled" }
    );

    let pipeline = Pipeline::from_config(&cfg)?;
    let synthesizer = Arc::new(CloudSynthesizer::new(&cfg.engines)?);
    let injector = PlaybackInjector::new(
        synthesizer,
        cfg.engines.request_timeout(),
        cfg.pipeline.playback_chunk_bytes,
    );
    let app = create_router(AppState::new(pipeline, injector));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
