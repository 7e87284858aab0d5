use anyhow::{Context, Result};
use clap::Parser;
use dukaan_voice::{
    create_router, declarations, Account, AppState, Config, EngineConfig, MemoryStore,
    OfflineDevices, OfflineEndpoint, Plan, TemplatePromo, VoiceEngine,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "dukaan-voice", about = "Voice dialogue engine for hands-free inventory")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/dukaan-voice")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Dukaan Voice v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Audio: capture {} Hz, playback {} Hz, blocks of {} frames",
        cfg.audio.input_sample_rate, cfg.audio.output_sample_rate, cfg.audio.capture_block_frames
    );
    info!("Assistant model: {}", cfg.assistant.model);
    info!("Declared tools: {}", declarations().len());

    let account = match cfg.shop.plan {
        Plan::Free => Account::free(cfg.shop.categories.clone()),
        Plan::Pro => Account::pro(cfg.shop.categories.clone()),
    };

    // Offline endpoint and simulated devices: the control plane is live,
    // sessions run without host audio or a remote conversational service.
    let engine_config = EngineConfig::from(&cfg);
    let endpoint = Arc::new(OfflineEndpoint::new(cfg.audio.output_sample_rate));
    let devices = Arc::new(OfflineDevices);
    let store = Arc::new(MemoryStore::new());
    let promo = Arc::new(TemplatePromo);

    let (engine, mut promo_rx) =
        VoiceEngine::new(engine_config, endpoint, devices, store, account, promo);

    tokio::spawn(async move {
        while let Some(notice) = promo_rx.recv().await {
            info!(
                "Promo ready for {} item(s): {}",
                notice.item_count, notice.content
            );
        }
    });

    let app = create_router(AppState::new(Arc::new(engine)));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
