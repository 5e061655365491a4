use anyhow::{Context, Result};
use clap::Parser;
use nimbus_config::{ConfigLoader, Validator};
use nimbus_exporter::cli::Cli;
use nimbus_exporter::orchestrator::{Backoff, LiveClients, Orchestrator};
use nimbus_metrics::{MetricsRegistry, MetricsServer, Snapshot};
use nimbus_observability::{init_tracing_with_config, LogConfig, LogFormat, LogOutput};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration: defaults, file, NIMBUS_* environment, then flags
    let mut config = ConfigLoader::without_validation()
        .load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Setup tracing
    let format: LogFormat = config.log.format.parse()?;
    let output: LogOutput = config.log.output.parse()?;
    init_tracing_with_config(
        LogConfig::new()
            .with_format(format)
            .with_level(config.log.level.as_str())
            .with_output(output)
            .with_color(config.log.color),
    )?;

    info!("starting nimbus-exporter at {}", config.listen_address);

    let registry =
        MetricsRegistry::new(&config.metrics_prefix).context("Failed to register metrics")?;
    let snapshot = Snapshot::new(registry);

    let bind_addr = config.bind_address();
    let server = MetricsServer::bind(&bind_addr, snapshot.clone())
        .await
        .context("Failed to start metrics endpoint")?;
    tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            error!("metrics server failed: {}", e);
            std::process::exit(1);
        }
    });

    let clients = LiveClients {
        cloud_conf: config.cloud_conf.clone(),
        kubeconfig: config.kubeconfig.clone(),
    };
    Orchestrator::new(
        clients,
        snapshot,
        config.refresh_interval(),
        Backoff::from(&config.backoff),
    )
    .run()
    .await;

    Ok(())
}
