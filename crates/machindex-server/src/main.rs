//! machindex - identity index for bare-metal inventory

use anyhow::{anyhow, Context};
use clap::Parser;
use machindex_client::IndexClient;
use machindex_core::{IndexSlot, RecordKind};
use machindex_operator::{bootstrap, crds, Indices};
use machindex_server::{
    api::{self, AppState},
    config::{Cli, Commands},
    observability::{init_metrics, init_tracing, shutdown_tracing, TracingConfig},
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();

    match cli.command {
        Commands::Crds => print_crds(),
        Commands::Serve {
            bind_addr,
            namespace,
            metrics,
        } => serve(bind_addr, namespace, metrics).await,
        Commands::Lookup {
            server,
            kind,
            mac,
            uuid,
            max_cache,
            timeout_secs,
        } => {
            lookup(
                &server,
                kind,
                mac.as_deref(),
                uuid.as_deref(),
                max_cache,
                Duration::from_secs(timeout_secs),
            )
            .await
        }
    }
}

fn print_crds() -> anyhow::Result<()> {
    for crd in crds() {
        println!("---");
        println!(
            "{}",
            serde_yaml::to_string(&crd).context("failed to serialize CRD")?
        );
    }
    Ok(())
}

async fn serve(
    bind_addr: SocketAddr,
    namespace: Option<String>,
    metrics_enabled: bool,
) -> anyhow::Result<()> {
    init_tracing(TracingConfig::from_env())
        .map_err(|e| anyhow!(e).context("failed to initialize tracing"))?;

    info!("Starting machindex server...");
    info!(bind_addr = %bind_addr, namespace = ?namespace, "configuration");

    let metrics_state = if metrics_enabled {
        Some(init_metrics().map_err(|e| anyhow!(e).context("failed to initialize metrics"))?)
    } else {
        None
    };

    // Lookups answer 406 until the indices are published and populated
    let machines = IndexSlot::new();
    let bmcs = IndexSlot::new();
    let types = IndexSlot::new();
    let state = AppState {
        machines: machines.subscribe(),
        bmcs: bmcs.subscribe(),
        types: types.subscribe(),
        metrics_state,
    };

    let app = api::create_router(state);
    info!("Starting API server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let client = kube::Client::try_default()
        .await
        .context("failed to connect to Kubernetes")?;
    info!("Connected to Kubernetes");

    let indices = Indices::default();
    machines.publish(indices.machines.clone());
    bmcs.publish(indices.bmcs.clone());
    types.publish(indices.types.clone());

    let result = tokio::select! {
        res = bootstrap::run(client, namespace, indices) => {
            res.context("failed to populate indices")
        }
        res = server => {
            res.context("API server task failed")
                .and_then(|res| res.context("API server failed"))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    shutdown_tracing();
    result
}

async fn lookup(
    server: &Url,
    kind: RecordKind,
    mac: Option<&str>,
    uuid: Option<&str>,
    max_cache: usize,
    timeout: Duration,
) -> anyhow::Result<()> {
    let client = IndexClient::for_kind(server, kind, max_cache)
        .with_context(|| format!("invalid server URL {server}"))?
        .with_timeout(timeout)?;

    let name = client
        .resolve(mac, uuid)
        .await
        .with_context(|| format!("{kind} lookup against {server} failed"))?;

    println!("{}", serde_json::to_string(&name)?);
    Ok(())
}
