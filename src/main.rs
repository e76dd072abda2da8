use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use chord_dht::dht::handlers::{handle_store_get, handle_store_post};
use chord_dht::dht::protocol::ENDPOINT_STORE;
use chord_dht::dht::server::Dht;
use chord_dht::ring::client::PeerClient;
use chord_dht::ring::handlers::handle_node;
use chord_dht::ring::maintenance;
use chord_dht::ring::node::Node;
use chord_dht::ring::protocol::ENDPOINT_NODE;
use chord_dht::storage::memory::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut addr: Option<String> = None;
    let mut join_addr: Option<String> = None;
    let mut id: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" => {
                addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--join" => {
                join_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--id" => {
                id = Some(u64::from_str_radix(&args[i + 1], 16)?);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(addr) = addr else {
        eprintln!(
            "Usage: {} --addr <host:port> [--join <host:port>] [--id <16-hex>]",
            args[0]
        );
        eprintln!("Example: {} --addr 127.0.0.1:5001", args[0]);
        eprintln!(
            "Example: {} --addr 127.0.0.1:5002 --join 127.0.0.1:5001",
            args[0]
        );
        std::process::exit(1);
    };

    let id = id.unwrap_or_else(rand::random);
    let node = Node::new(id, addr.clone());
    tracing::info!("node {} starting", node.serialize());

    // Bind before joining; the bootstrap peer may call back immediately.
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let store = Arc::new(MemoryStore::new());

    let app = Router::new()
        .route(ENDPOINT_NODE, get(handle_node))
        .route(
            ENDPOINT_STORE,
            get(handle_store_get::<MemoryStore>).post(handle_store_post::<MemoryStore>),
        )
        .layer(Extension(node.clone()))
        .layer(Extension(store.clone()));

    let serve_shutdown = CancellationToken::new();
    let serve_signal = serve_shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { serve_signal.cancelled().await })
            .await
    });

    // Bootstrap failures are fatal; no partial join state is committed.
    if let Some(join_addr) = join_addr {
        let client = PeerClient::new();
        let bootstrap = client.identify(&join_addr).await?;
        tracing::info!("joining via {}", bootstrap.serialize());
        node.join(&bootstrap).await?;
    }

    let dht = Dht::new(node.clone(), store.clone()).await?;

    let shutdown = CancellationToken::new();
    let maintenance_handle = tokio::spawn(maintenance::run(node.clone(), shutdown.clone()));

    tracing::info!("listening on {}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    // Quiesce the ring state, hand our keys off, then close the listener.
    shutdown.cancel();
    if let Err(e) = maintenance_handle.await {
        tracing::warn!("maintenance task panicked: {}", e);
    }
    if let Err(e) = dht.depart().await {
        tracing::warn!("departure hand-off failed: {}", e);
    }
    serve_shutdown.cancel();
    server.await??;

    Ok(())
}
