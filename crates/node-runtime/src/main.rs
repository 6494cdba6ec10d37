//! # Delegate-Mesh Node Runtime
//!
//! Entry point for the mesh node. Wires the subsystems to the transport
//! adapters:
//!
//! - Peer lifecycle (dm-01): connection tracking and the discovery strategy
//! - Store sync (dm-02): replicated key-value exchange
//! - Ledger (dm-03): block sealing and delegate validation
//!
//! The binary boots two endpoints on an in-process fabric, runs a store
//! replication round and a block sealing round between them, then idles
//! until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dm_01_peer_lifecycle::{NetworkService, Transport};
use dm_02_store_sync::StoreService;
use dm_03_ledger::{Block, DelegateSelector};
use shared_types::{StoreItem, StoreRequest, Transaction};

use node_runtime::adapters::{DigestDelegateSelector, MemoryEndpoint, MemoryFabric};
use node_runtime::config::RuntimeConfig;

/// One fully wired mesh node on the fabric.
struct MeshNode {
    endpoint: Arc<MemoryEndpoint>,
    network: Arc<NetworkService<MemoryEndpoint>>,
    store: Arc<StoreService>,
}

impl MeshNode {
    /// Attach an endpoint to the fabric and wire the subsystems to it.
    fn build(fabric: &MemoryFabric, peer_id: &str, addr: &str, config: &RuntimeConfig) -> Self {
        let endpoint = fabric.endpoint(peer_id, addr);

        let store = Arc::new(StoreService::new(&config.network));
        store.start();
        let inbound = Arc::clone(&store);
        endpoint.register_protocol(
            store.protocol(),
            Arc::new(move |stream, remote| {
                let service = Arc::clone(&inbound);
                tokio::spawn(async move {
                    service.handle_message(stream, &remote).await;
                });
            }),
        );

        let protocols = &config.network.protocols;
        endpoint.advertise(&[
            protocols.role.as_str(),
            protocols.multiaddrs.as_str(),
            protocols.peer_list.as_str(),
        ]);
        endpoint.script_discovery(|d| {
            d.roles = "[\"relay\"]".into();
            d.multiaddrs = format!("[\"{addr}\"]");
        });

        let network = Arc::new(NetworkService::new(
            Arc::clone(&endpoint),
            config.network.clone(),
        ));

        Self {
            endpoint,
            network,
            store,
        }
    }

    async fn start(&self) -> Result<()> {
        self.network
            .start_async()
            .await
            .context("failed to start network service")?;
        Ok(())
    }

    fn shutdown(&self) {
        self.store.stop();
        self.network.shutdown();
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Seal a block over the current neighbor set and check it validates.
fn seal_demo_block(neighbors: Vec<String>) {
    let selector = DigestDelegateSelector::new(3);
    let timestamp = unix_timestamp();
    let previous_hash = "0".repeat(64);
    let delegates = selector.select_delegates(&previous_hash, timestamp, &neighbors);
    let reward = Transaction::new("reward-0", "mesh", "dmesh-alpha", 50, timestamp);

    let block = Block::new(
        0,
        previous_hash,
        timestamp,
        reward,
        Vec::new(),
        Vec::new(),
        Vec::new(),
        neighbors,
        delegates,
    );
    info!(
        hash = %block.hash,
        merkle_root = %block.merkle_root,
        valid = block.is_valid(&selector),
        "sealed demo block"
    );
}

async fn run_store_round(alpha: &MeshNode, beta: &MeshNode) -> Result<()> {
    // Beta owns a record; alpha pulls it over the store protocol.
    beta.store.put_store(StoreItem::new(
        "dmesh-beta",
        "genesis",
        serde_json::json!({ "height": 0 }),
    ));

    let conn = alpha
        .endpoint
        .dial(beta.endpoint.addr())
        .await
        .context("failed to dial peer")?;

    let request = StoreRequest::by_key("genesis");
    let raw = alpha
        .store
        .get_store(&conn, &request, None)
        .await
        .context("store exchange failed")?;
    info!(payload = %raw, merged = alpha.store.store_len(), "store replication round complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = RuntimeConfig::load_or_default(&config_path);

    info!("===========================================");
    info!("  Delegate-Mesh Node Runtime v0.1.0");
    info!("===========================================");

    let fabric = MemoryFabric::new();
    let alpha = MeshNode::build(
        &fabric,
        &config.node.peer_id,
        &config.node.listen_addr,
        &config,
    );
    let beta = MeshNode::build(&fabric, "dmesh-beta", "/memory/2", &config);

    alpha.start().await?;
    beta.start().await?;

    for addr in &config.bootstrap {
        if let Err(e) = alpha.endpoint.dial(addr).await {
            warn!(%addr, error = %e, "bootstrap dial failed");
        }
    }

    run_store_round(&alpha, &beta).await?;

    // Let the discovery cycle observe the new connection once.
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!(tracked = alpha.network.strategy().node_count(), "peer registry populated");

    seal_demo_block(vec![config.node.peer_id.clone(), "dmesh-beta".into()]);

    info!("node is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    alpha.shutdown();
    beta.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    Ok(())
}
