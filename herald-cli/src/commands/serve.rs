use std::net::SocketAddr;
use std::sync::Arc;

use herald_core::{build_sender, Config, MetricsRecorder};

use crate::Stores;

pub async fn handle_serve_command(
    config: &Config,
    stores: &Stores,
    host: Option<String>,
    port: Option<u16>,
    metrics_addr: Option<SocketAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = metrics_addr {
        MetricsRecorder::install_prometheus(addr)?;
        tracing::info!(addr = %addr, "Prometheus exporter listening");
    }

    let sender = build_sender(&config.push)?;
    let state = herald_api::AppState::new(
        &config.fanout,
        Arc::clone(&stores.documents),
        sender,
    );
    let app = herald_api::create_router(state);

    let host = host.unwrap_or_else(|| config.api.host.clone());
    let addr = format_bind_address(host.trim(), port.unwrap_or(config.api.port));

    println!("Starting herald on http://{}", addr);
    println!("Data directory: {}", config.data_dir.display());
    println!(
        "Direct policy: {}, group guard: {:?}",
        config.fanout.direct_policy.name(),
        config.fanout.group_guard
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn format_bind_address(host: &str, port: u16) -> String {
    if host.starts_with('[') && host.ends_with(']') {
        format!("{}:{}", host, port)
    } else if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
