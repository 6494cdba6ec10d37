//! # Store Replication Integration Flows
//!
//! Runs the dm-02 store protocol end to end over the fabric: one endpoint
//! serves its store through an inbound handler, the other pulls and merges.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dm_01_peer_lifecycle::Transport;
    use dm_02_store_sync::{StoreError, StoreService};
    use node_runtime::adapters::{MemoryEndpoint, MemoryFabric};
    use shared_types::{NetworkConfig, StoreItem, StoreRequest};

    fn fast_config() -> NetworkConfig {
        NetworkConfig {
            request_timeout_ms: 200,
            ..NetworkConfig::default()
        }
    }

    /// Wire a started store service into an endpoint's inbound handler.
    fn serve_store(endpoint: &Arc<MemoryEndpoint>, config: &NetworkConfig) -> Arc<StoreService> {
        let store = Arc::new(StoreService::new(config));
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
        store
    }

    #[tokio::test]
    async fn test_item_replicates_between_endpoints() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        let alpha_store = serve_store(&alpha, &config);
        let beta_store = serve_store(&beta, &config);
        beta_store.put_store(StoreItem::new(
            "beta",
            "genesis",
            serde_json::json!({ "height": 0 }),
        ));

        let conn = alpha.dial("/memory/2").await.unwrap();
        alpha_store
            .get_store(&conn, &StoreRequest::by_key("genesis"), None)
            .await
            .unwrap();

        let item = alpha_store.get_local("beta", "genesis").expect("merged");
        assert_eq!(item.value, serde_json::json!({ "height": 0 }));
        assert_eq!(alpha_store.store_len(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_answers_empty_array() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        let alpha_store = serve_store(&alpha, &config);
        serve_store(&beta, &config);

        let conn = alpha.dial("/memory/2").await.unwrap();
        let raw = alpha_store
            .get_store(&conn, &StoreRequest::by_key("anything"), None)
            .await
            .unwrap();

        assert_eq!(raw, "[]");
        assert_eq!(alpha_store.store_len(), 0);
    }

    #[tokio::test]
    async fn test_dual_filter_request_yields_two_frames() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        let alpha_store = serve_store(&alpha, &config);
        let beta_store = serve_store(&beta, &config);
        beta_store.put_store(StoreItem::new("beta", "genesis", serde_json::json!(0)));
        beta_store.put_store(StoreItem::new("gamma", "tip", serde_json::json!(7)));

        let conn = alpha.dial("/memory/2").await.unwrap();
        let request = StoreRequest {
            key: Some("genesis".into()),
            peer_id: Some("gamma".into()),
        };
        let raw = alpha_store.get_store(&conn, &request, None).await.unwrap();

        // One response frame per filter, concatenated by the reader.
        assert_eq!(raw.matches('[').count(), 2);
        assert!(raw.contains("genesis"));
        assert!(raw.contains("gamma"));
    }

    #[tokio::test]
    async fn test_silent_server_times_out_and_releases_stream_once() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        let alpha_store = serve_store(&alpha, &config);
        beta.serve_silently(alpha_store.protocol().to_string());

        let conn = alpha.dial("/memory/2").await.unwrap();
        let result = alpha_store
            .get_store(
                &conn,
                &StoreRequest::by_peer("beta"),
                Some(Duration::from_millis(50)),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
        let probe = fabric.last_stream_probe().expect("stream opened");
        assert!(probe.released_exactly_once());
        assert_eq!(probe.aborts(), 1);
    }

    #[tokio::test]
    async fn test_later_write_wins_across_replications() {
        let config = fast_config();
        let fabric = MemoryFabric::new();
        let alpha = fabric.endpoint("alpha", "/memory/1");
        let beta = fabric.endpoint("beta", "/memory/2");
        let alpha_store = serve_store(&alpha, &config);
        let beta_store = serve_store(&beta, &config);

        let conn = alpha.dial("/memory/2").await.unwrap();
        beta_store.put_store(StoreItem::new("beta", "tip", serde_json::json!(1)));
        alpha_store
            .get_store(&conn, &StoreRequest::by_peer("beta"), None)
            .await
            .unwrap();

        beta_store.put_store(StoreItem::new("beta", "tip", serde_json::json!(2)));
        alpha_store
            .get_store(&conn, &StoreRequest::by_peer("beta"), None)
            .await
            .unwrap();

        let item = alpha_store.get_local("beta", "tip").expect("replicated");
        assert_eq!(item.value, serde_json::json!(2));
        assert_eq!(alpha_store.store_len(), 1);
    }
}
