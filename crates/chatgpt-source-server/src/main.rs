#![doc = include_str!("../README.md")]

use chatgpt_source_server::server::{
    config::{CliArgs, ServerConfig},
    generation::OpenAiClient,
    service::IntakeService,
    sink::{EventSink, HttpSink, LogSink},
    telemetry::init_telemetry,
};
use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, task::JoinHandle};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let generator = Arc::new(OpenAiClient::new(&config.generation)?);
    let sink: Arc<dyn EventSink> = match &config.delivery.target {
        Some(target) => {
            let sink = HttpSink::new(target.clone(), config.delivery.timeout)?;
            tracing::info!("Delivering events to {}", sink.target());
            Arc::new(sink)
        }
        None => {
            tracing::warn!("No TARGET configured, events will only be logged");
            Arc::new(LogSink)
        }
    };
    let service = IntakeService::new(&config, generator, sink);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    log_startup_info(&addr, &config);

    let (drained_tx, drained_rx) = tokio::sync::oneshot::channel();
    axum::serve(listener, service.router())
        .with_graceful_shutdown(shutdown_signal(service, drained_tx))
        .await?;

    // Connections are closed; wait for the consumers to finish too.
    if let Ok(drain) = drained_rx.await {
        if let Err(e) = drain.await {
            tracing::error!("Error during service shutdown: {e}");
        }
    }

    tracing::info!("Service shut down successfully");
    providers.shutdown();
    Ok(())
}

fn log_startup_info(addr: &str, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting chatgpt source on {addr} with full config: {config:#?}");
    } else {
        tracing::info!(
            "Starting chatgpt source on {addr} (queue capacity {}, {} consumers)",
            config.queue_capacity,
            config.delivery.num_consumers
        );
    }
}

/// Resolves once a termination signal arrives, after starting the drain.
///
/// Requests still running are blocked on their events, so the drain has to
/// run alongside the server's own connection draining rather than after it.
async fn shutdown_signal(
    service: IntakeService,
    drained: tokio::sync::oneshot::Sender<JoinHandle<()>>,
) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    let drain = tokio::spawn(async move { service.shutdown().await });
    let _ = drained.send(drain);
}
