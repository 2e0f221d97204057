use proxyman_rs::api::server::ApiServer;
use proxyman_rs::api::AppState;
use proxyman_rs::certs::CertificateStore;
use proxyman_rs::config::Config;
use proxyman_rs::nginx::{ConfigWriter, NginxProcess, ReloadCoordinator, TokioCommandRunner};
use proxyman_rs::rules::RuleManager;
use proxyman_rs::telemetry::TelemetryManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so logging can follow it
    let config = if std::path::Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        Config::default()
    };

    init_logging(&config);

    info!("Starting proxyman-rs");
    info!("  API listening on: {}", config.server.listen_addr);
    info!("  nginx binary: {}", config.nginx.binary);
    info!("  config dir: {}", config.nginx.config_dir.display());
    info!("  ssl dir: {}", config.nginx.ssl_dir.display());

    let runner = Arc::new(TokioCommandRunner);
    let process = Arc::new(NginxProcess::new(runner, config.nginx.binary.clone()));
    let coordinator = Arc::new(ReloadCoordinator::new(
        process.clone(),
        Duration::from_secs(config.nginx.reload_timeout_secs),
    ));
    let writer = Arc::new(ConfigWriter::new(config.nginx.config_dir.clone()));

    let rules = Arc::new(RuleManager::new(
        writer,
        coordinator,
        process.clone(),
        config.rules.max_rules,
    ));
    let telemetry = Arc::new(TelemetryManager::new());
    let certs = Arc::new(CertificateStore::new(config.nginx.ssl_dir.clone()));

    let daemon = process.status().await;
    if daemon.running {
        info!(
            "nginx daemon available (version {})",
            daemon.version.as_deref().unwrap_or("unknown")
        );
    } else {
        warn!("nginx daemon not reachable; rule changes will fail to apply");
    }

    let state = Arc::new(AppState {
        rules,
        telemetry,
        certs,
        process,
    });

    let server = ApiServer::new(config.server.listen_addr.clone(), state);
    server.run().await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if config.logging.format == "json" {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .pretty()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
