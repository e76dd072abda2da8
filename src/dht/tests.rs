#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::Extension;
    use axum::routing::get;
    use axum::Router;

    use crate::dht::handlers::{handle_store_get, handle_store_post};
    use crate::dht::protocol::StoreDump;
    use crate::dht::server::Dht;
    use crate::ring::handlers::handle_node;
    use crate::ring::node::Node;
    use crate::ring::types::Peer;
    use crate::storage::memory::{MemoryStore, Store};

    struct TestNode {
        node: Arc<Node>,
        dht: Arc<Dht<MemoryStore>>,
        store: Arc<MemoryStore>,
        server: tokio::task::JoinHandle<()>,
    }

    /// A complete node: ring endpoint, store endpoint and facade, listening
    /// on an ephemeral port. Mirrors the wiring in `main.rs`.
    async fn spawn_dht_node(id: u64, bootstrap: Option<&Peer>) -> TestNode {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
        let node = Node::new(id, host);
        let store = Arc::new(MemoryStore::new());

        let app = Router::new()
            .route("/node", get(handle_node))
            .route(
                "/store",
                get(handle_store_get::<MemoryStore>).post(handle_store_post::<MemoryStore>),
            )
            .layer(Extension(node.clone()))
            .layer(Extension(store.clone()));
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        if let Some(peer) = bootstrap {
            node.join(peer).await.unwrap();
        }
        let dht = Dht::new(node.clone(), store.clone()).await.unwrap();

        TestNode {
            node,
            dht,
            store,
            server,
        }
    }

    // ============================================================
    // BULK WIRE FORMAT
    // ============================================================

    #[test]
    fn test_store_dump_round_trip() {
        let mut entries = HashMap::new();
        entries.insert(0x1u64, b"one".to_vec());
        entries.insert(0xDEAD_BEEFu64, vec![0, 159, 146, 150]);

        let decoded = StoreDump::encode(&entries).decode().unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_store_dump_rejects_bad_keys() {
        let mut raw = HashMap::new();
        raw.insert("not-hex".to_string(), base64::encode(b"x"));
        assert!(StoreDump(raw).decode().is_err());
    }

    // ============================================================
    // FACADE SCENARIOS
    // ============================================================

    #[tokio::test]
    async fn test_solo_put_get() {
        let a = spawn_dht_node(0x1, None).await;

        a.dht.put(0xDEAD_BEEF, b"hello".to_vec()).await.unwrap();
        assert_eq!(a.dht.get(0xDEAD_BEEF).await.unwrap(), b"hello".to_vec());

        // absent and empty are the same thing at this layer
        assert!(a.dht.get(0x42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_lands_on_the_responsible_node() {
        let a = spawn_dht_node(0x10, None).await;
        let b = spawn_dht_node(0x80, Some(&a.node.self_peer())).await;

        b.node.stabilize().await;
        a.node.stabilize().await;
        b.node.stabilize().await;

        // (0x10, 0x80] belongs to B, (0x80, 0x10] wraps back to A
        a.dht.put(0x40, b"on b".to_vec()).await.unwrap();
        b.dht.put(0xF0, b"on a".to_vec()).await.unwrap();

        assert!(b.store.contains(0x40));
        assert!(!a.store.contains(0x40));
        assert!(a.store.contains(0xF0));
        assert!(!b.store.contains(0xF0));

        // both arcs readable from both nodes
        assert_eq!(a.dht.get(0x40).await.unwrap(), b"on b".to_vec());
        assert_eq!(b.dht.get(0x40).await.unwrap(), b"on b".to_vec());
        assert_eq!(a.dht.get(0xF0).await.unwrap(), b"on a".to_vec());
        assert_eq!(b.dht.get(0xF0).await.unwrap(), b"on a".to_vec());
    }

    #[tokio::test]
    async fn test_join_hands_off_the_moved_range() {
        let a = spawn_dht_node(0x10, None).await;
        a.dht.put(0x40, b"moves".to_vec()).await.unwrap();
        assert!(a.store.contains(0x40));

        // B replicates A's store while joining, then stabilization tells A
        // about its new predecessor and A sheds the moved keys
        let b = spawn_dht_node(0x80, Some(&a.node.self_peer())).await;
        assert!(
            b.store.contains(0x40),
            "joiner must start as a replica of its successor"
        );

        b.node.stabilize().await;
        a.node.stabilize().await;

        assert!(
            !a.store.contains(0x40),
            "old owner must constrain away the moved range"
        );
        assert!(b.store.contains(0x40));
        assert_eq!(a.dht.get(0x40).await.unwrap(), b"moves".to_vec());
    }

    #[tokio::test]
    async fn test_clean_departure_hands_keys_to_predecessor() {
        let a = spawn_dht_node(0x10, None).await;
        let b = spawn_dht_node(0x40, Some(&a.node.self_peer())).await;
        b.node.stabilize().await;
        a.node.stabilize().await;

        let c = spawn_dht_node(0x80, Some(&a.node.self_peer())).await;
        c.node.stabilize().await;
        b.node.stabilize().await;
        a.node.stabilize().await;
        c.node.stabilize().await;

        a.dht.put(0x70, b"survives".to_vec()).await.unwrap();
        assert!(c.store.contains(0x70), "0x70 is on C's arc");

        c.dht.depart().await.unwrap();
        c.server.abort();

        assert!(
            b.store.contains(0x70),
            "a clean leave hands the store to the predecessor"
        );
        assert_eq!(b.store.get(0x70).unwrap(), b"survives".to_vec());
    }

    // ============================================================
    // STORE ENDPOINT
    // ============================================================

    #[tokio::test]
    async fn test_store_endpoint_bulk_round_trip() {
        let a = spawn_dht_node(0x10, None).await;
        let base = format!("http://{}/store", a.node.host());
        let client = reqwest::Client::new();

        let mut entries = HashMap::new();
        entries.insert(0x40u64, b"bulk".to_vec());
        entries.insert(0x41u64, b"insert".to_vec());
        let response = client
            .post(&base)
            .json(&StoreDump::encode(&entries))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert!(a.store.contains(0x40));

        let value = client
            .get(format!("{}?key={:016x}", base, 0x41u64))
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(value.as_ref(), b"insert");

        let dump: StoreDump = client
            .get(&base)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(dump.decode().unwrap(), entries);
    }

    #[tokio::test]
    async fn test_store_endpoint_rejects_malformed_input() {
        let a = spawn_dht_node(0x10, None).await;
        let base = format!("http://{}/store", a.node.host());
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}?key=not-hex", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = client
            .post(&base)
            .body("not json".as_bytes().to_vec())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(a.store.is_empty(), "rejected input must not mutate the store");
    }
}
