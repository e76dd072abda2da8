//! Ring Maintenance Loop
//!
//! One background task per node driving the three periodic repairs:
//! stabilization, fix-fingers and the predecessor liveness check. The loop
//! owns no state of its own; it just ticks the [`Node`] operations, which
//! absorb their own errors. Cancelling the token stops the loop promptly so
//! the departure hand-off can run against a quiescent node.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::node::Node;

const STABILIZE_INTERVAL: Duration = Duration::from_secs(1);
const FIX_FINGERS_INTERVAL: Duration = Duration::from_millis(100);
const CHECK_PREDECESSOR_INTERVAL: Duration = Duration::from_secs(10);

pub async fn run(node: Arc<Node>, shutdown: CancellationToken) {
    let mut stabilize = interval(STABILIZE_INTERVAL);
    let mut fix_fingers = interval(FIX_FINGERS_INTERVAL);
    let mut check_predecessor = interval(CHECK_PREDECESSOR_INTERVAL);

    info!("maintenance loop started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("maintenance loop stopped");
                return;
            }
            _ = stabilize.tick() => node.stabilize().await,
            _ = fix_fingers.tick() => node.fix_next_finger().await,
            _ = check_predecessor.tick() => node.check_predecessor().await,
        }
    }
}
