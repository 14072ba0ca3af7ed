use std::sync::Arc;

use anyhow::{Context, Result};
use careerhub::{
    create_router, AppState, Config, CpalDeviceFactory, GeminiAnalyzer, GeminiLive, JsonFileStore,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "careerhub", about = "Career assistant service")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/careerhub")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "careerhub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::load(&args.config)?;
    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;

    info!("{} starting", cfg.service.name);

    let state = AppState::new(
        Arc::new(JsonFileStore::new(cfg.storage.data_dir.clone())),
        Arc::new(GeminiAnalyzer::new(
            &cfg.analysis.endpoint,
            &cfg.analysis.model,
            &api_key,
        )),
        Arc::new(CpalDeviceFactory),
        Arc::new(GeminiLive::new(&cfg.live.endpoint, &api_key)),
        Arc::new(cfg.clone()),
    );
    let router = create_router(state);

    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
