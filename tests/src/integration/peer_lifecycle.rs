//! # Peer Lifecycle Integration Flows
//!
//! Exercises the dm-01 orchestrator against the in-memory fabric: registry
//! population from transport events, protocol-gated discovery, and the
//! eviction path for rate-limited peers.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dm_01_peer_lifecycle::{NetworkService, Transport};
    use node_runtime::adapters::{MemoryEndpoint, MemoryFabric};
    use shared_types::{ConnectionStatus, NetworkConfig};

    /// Tight intervals so discovery cycles run within the test window.
    fn fast_config() -> NetworkConfig {
        NetworkConfig {
            strategy_interval_ms: 50,
            disconnect_grace_ms: 500,
            request_timeout_ms: 500,
            ..NetworkConfig::default()
        }
    }

    fn discovery_protocols(config: &NetworkConfig) -> Vec<&str> {
        vec![
            config.protocols.role.as_str(),
            config.protocols.multiaddrs.as_str(),
            config.protocols.peer_list.as_str(),
        ]
    }

    async fn started_service(
        endpoint: &Arc<MemoryEndpoint>,
        config: NetworkConfig,
    ) -> Arc<NetworkService<MemoryEndpoint>> {
        let service = Arc::new(NetworkService::new(Arc::clone(endpoint), config));
        service.start_async().await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_connection_open_populates_registry_with_protocols() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        beta.advertise(&discovery_protocols(&config));

        let service = started_service(&alpha, config.clone()).await;
        alpha.dial("/memory/2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let node = service.strategy().get("beta").expect("beta tracked");
        let node = node.read();
        assert!(node.is_connect());
        assert!(node.protocols.contains(&config.protocols.role));
        assert!(node.protocols.contains(&config.protocols.peer_list));
        drop(node);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_discovery_pulls_roles_and_dials_published_multiaddrs() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        let gamma = fabric.endpoint("gamma", "/memory/3");
        beta.advertise(&discovery_protocols(&config));
        gamma.advertise(&discovery_protocols(&config));
        beta.script_discovery(|d| {
            d.roles = "[\"validator\"]".into();
            // Beta publishes gamma's multiaddress; alpha should dial it.
            d.multiaddrs = "[\"/memory/3\"]".into();
        });

        let service = started_service(&alpha, config).await;
        alpha.dial("/memory/2").await.unwrap();
        // Two strategy cycles: one to learn the multiaddress, one to settle.
        tokio::time::sleep(Duration::from_millis(250)).await;

        let node = service.strategy().get("beta").expect("beta tracked");
        assert_eq!(node.read().roles, vec!["validator".to_string()]);
        assert!(
            service.strategy().is_tracked("gamma"),
            "published multiaddress must be dialed and tracked"
        );

        service.shutdown();
    }

    #[tokio::test]
    async fn test_peer_list_seeds_unknown_peers() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        beta.advertise(&discovery_protocols(&config));
        beta.script_discovery(|d| {
            // The local peer must not be seeded back into its own registry.
            d.peer_list = "[\"delta\", \"alpha\"]".into();
        });

        let service = started_service(&alpha, config).await;
        alpha.dial("/memory/2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(service.strategy().is_tracked("delta"));
        assert!(!service.strategy().is_tracked("alpha"));

        service.shutdown();
    }

    #[tokio::test]
    async fn test_rate_limited_peer_is_evicted_and_disconnected() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        beta.advertise(&discovery_protocols(&config));
        beta.script_discovery(|d| d.rate_limit_roles = true);

        let service = started_service(&alpha, config).await;
        let conn = alpha.dial("/memory/2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(service.strategy().is_tracked("beta"));

        // The next discovery cycle hits the rate limit and evicts.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!service.strategy().is_tracked("beta"));
        assert_eq!(conn.status(), ConnectionStatus::Closed);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_remote_disconnect_removes_node() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        beta.advertise(&discovery_protocols(&config));

        let service = started_service(&alpha, config).await;
        alpha.dial("/memory/2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(service.strategy().is_tracked("beta"));

        // Beta tears the link down from its side.
        beta.disconnect("/memory/1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!service.strategy().is_tracked("beta"));

        service.shutdown();
    }
}
