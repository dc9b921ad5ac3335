use std::sync::Arc;

use anyhow::Context;
use esp_codec::{
    codec::manager::CodecManager,
    events::TracingEventSink,
    metrics::{registry, server::start_metrics_server},
    runtime::{
        Runtime, logging,
        pipeline::{Pipeline, PipelineConf},
    },
    source::HexPacketReader,
};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Runtime { cli, conf } = Runtime::new()?;
    logging::init(conf.log_level);

    info!(
        event.name = "app.starting",
        app.version = env!("CARGO_PKG_VERSION"),
        config.path = ?conf.config_path,
        decoders.esp.enabled = conf.decoders.esp.enabled,
        "starting esp-codec"
    );
    if !conf.decoders.esp.enabled {
        warn!(
            event.name = "app.esp_disabled",
            "ESP decoding is disabled, every ESP layer will be rejected (set decoders.esp.enabled)"
        );
    }

    registry::init_registry().context("failed to register metrics")?;
    let metrics_task = conf.metrics.enabled.then(|| {
        let metrics_conf = conf.metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(metrics_conf).await {
                error!(
                    event.name = "metrics.failed",
                    error.message = %e,
                    "metrics server stopped"
                );
            }
        })
    });

    let manager = Arc::new(
        CodecManager::from_conf(&conf.decoders, conf.max_layers)
            .context("failed to build the codec table")?,
    );
    let reader = HexPacketReader::open(&cli.input).await?;
    let pipeline = Pipeline::new(
        PipelineConf::from(&conf),
        Arc::clone(&manager),
        Arc::new(TracingEventSink),
    );

    let summary = pipeline.run(reader).await?;
    println!("{}", serde_json::to_string(&summary)?);

    if let Some(task) = metrics_task {
        if cli.linger {
            info!(
                event.name = "app.lingering",
                "input done, serving metrics until Ctrl-C"
            );
            signal::ctrl_c().await?;
        }
        task.abort();
    }

    info!(event.name = "app.stopped", "esp-codec stopped");
    Ok(())
}
