pub mod actor;
pub mod handler;
pub mod protocol;
pub mod registry;

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Process-unique identifier for one accepted socket.
///
/// Registry entries record the ConnId of the connection that registered them,
/// so unregistering an old, already-superseded connection never evicts the
/// connection currently registered under the same participant id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

impl ConnId {
    /// Allocate the next connection id.
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Back-reference recorded on the connection task at registration time.
/// Carries everything unregistration needs, making it O(1) and
/// identity-scoped rather than an id-keyed scan.
#[derive(Debug, Clone)]
pub enum Registration {
    Captain { captain_id: String },
    Rider { rider_id: String },
    Admin,
}
