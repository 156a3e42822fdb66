use std::sync::Arc;

use crate::db::DbPool;
use crate::notify::push::PushClient;
use crate::tracking::store::LocationStore;
use crate::ws::registry::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
///
/// The connection registry and location store are the only mutable shared
/// structures in the relay; both are created empty at startup, owned here,
/// and mutated only through their own methods.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Live WebSocket connections per role and participant id
    pub connections: Arc<ConnectionRegistry>,
    /// Last-known location per connected captain
    pub locations: Arc<LocationStore>,
    /// Best-effort FCM push client
    pub push: Arc<PushClient>,
}
