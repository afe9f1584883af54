mod config;

use clap::Parser;
use config::Config;
use metrics_exporter_statsd::StatsdBuilder;
use notifier::{Dispatcher, RelayHandler, RelayService};
use paramstore::{HttpParameterStore, ParamCache};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "courier", about = "Notification relay for chat destinations")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "courier.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        tracing::error!("courier failed to start: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(&cli.config)?;

    if let Some(metrics) = &config.metrics {
        let recorder = StatsdBuilder::from(metrics.statsd_host.clone(), metrics.statsd_port)
            .build(Some("courier"))?;
        if let Err(e) = metrics::set_global_recorder(recorder) {
            tracing::warn!("failed to install metrics recorder: {e}");
        }
    }

    let store = Arc::new(HttpParameterStore::new(
        config.param_store.url.clone(),
        config.param_store.auth_token.clone(),
    ));
    let cache = ParamCache::new(
        store,
        config.param_store.parameters.clone().into(),
        Duration::from_secs(config.param_store.cache_ttl_secs),
    );
    let dispatcher = Dispatcher::new(config.messaging.api_base.clone());
    let service = RelayService::new(RelayHandler::new(cache.clone(), dispatcher));

    // Ready once the configuration has been resolved at least once; keep
    // probing until the store answers so a slow store only delays readiness.
    let ready = Arc::new(AtomicBool::new(false));
    {
        let ready = ready.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            loop {
                match cache.resolve().await {
                    Ok(_) => {
                        tracing::info!("Configuration resolved, relay is ready");
                        ready.store(true, Ordering::Relaxed);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Configuration not yet resolvable");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    {
        let admin = config.admin_listener.clone();
        let ready = ready.clone();
        tokio::spawn(async move {
            let admin_service = AdminService::new(move || ready.load(Ordering::Relaxed));
            if let Err(e) = run_http_service(&admin.host, admin.port, admin_service).await {
                tracing::error!("admin listener failed: {e}");
            }
        });
    }

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        "courier listening"
    );
    run_http_service(&config.listener.host, config.listener.port, service).await?;

    Ok(())
}
