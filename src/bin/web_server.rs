//! Web server for the virtual try-on API

use anyhow::Context;
use clap::Parser;
use log::info;
use std::sync::Arc;

use tryon_relay::common::logging::init_logger;
use tryon_relay::{
    build_router, AppState, BackendClientAdapter, GradioClient, RelayConfig, TransientStorage,
    TryOnService,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on, overrides the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// Hugging Face access token
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if args.hf_token.is_some() {
        config.backend.hf_token = args.hf_token;
    }

    info!("Connecting to {} model...", config.backend.source);
    let backend = GradioClient::connect(&config.backend.source, config.backend.hf_token.clone())
        .await
        .context("Could not reach the synthesis backend")?;
    info!("✅ Connected successfully!");

    let storage = TransientStorage::new(config.storage.root_dir());
    let adapter = BackendClientAdapter::new(Arc::new(backend), config.backend.timeout());
    let service = TryOnService::new(storage, adapter, config.synthesis.clone());

    let app = build_router(AppState::new(service), config.server.max_upload_bytes);

    let addr = config.server.bind_address.as_str();
    info!("{}", "=".repeat(50));
    info!("🚀 Virtual Try-On Server Starting...");
    info!("{}", "=".repeat(50));
    info!("📍 Server running on: http://{}", addr);
    info!("🎯 Endpoint: POST /api/virtual-tryon");
    info!("🤖 Model: IDM-VTON (via Gradio Client)");
    match config.backend.timeout() {
        Some(limit) => info!("⏱️  Backend timeout: {:?}", limit),
        None => info!("⏱️  Backend timeout: none"),
    }
    info!("{}", "=".repeat(50));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
