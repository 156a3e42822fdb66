//! Connection registry: the live set of open WebSocket connections,
//! keyed by role and participant id.
//!
//! Captains and riders hold at most one live connection per id — a reconnect
//! silently supersedes the old entry. Admins may hold any number of observer
//! sessions. Entries exist only while the owning channel is open; the
//! connection actor removes its own entry in its close path.

use dashmap::DashMap;

use super::{ConnId, ConnectionSender, Registration};

/// A registered sender together with the identity of the socket that
/// registered it.
#[derive(Debug, Clone)]
struct RegisteredSender {
    conn_id: ConnId,
    sender: ConnectionSender,
}

/// Live connections for all three participant roles.
/// DashMap keeps register/unregister/lookup/enumeration atomic per shard;
/// no lock is ever held across a network send — sends go through the
/// per-connection unbounded channels.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    captains: DashMap<String, RegisteredSender>,
    riders: DashMap<String, RegisteredSender>,
    admins: DashMap<ConnId, ConnectionSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a captain connection, superseding any prior connection for
    /// that captain id. The superseded entry is simply dropped: dispatch only
    /// ever targets the registry's current value for an id.
    pub fn register_captain(&self, captain_id: &str, conn_id: ConnId, sender: ConnectionSender) {
        self.captains
            .insert(captain_id.to_string(), RegisteredSender { conn_id, sender });
        tracing::debug!(captain_id = %captain_id, ?conn_id, "Captain connection registered");
    }

    /// Register a rider connection, superseding any prior connection for
    /// that rider id.
    pub fn register_rider(&self, rider_id: &str, conn_id: ConnId, sender: ConnectionSender) {
        self.riders
            .insert(rider_id.to_string(), RegisteredSender { conn_id, sender });
        tracing::debug!(rider_id = %rider_id, ?conn_id, "Rider connection registered");
    }

    /// Register an admin observer connection. No deduplication: an admin may
    /// legitimately hold several observer sessions at once.
    pub fn register_admin(&self, conn_id: ConnId, sender: ConnectionSender) {
        self.admins.insert(conn_id, sender);
        tracing::debug!(?conn_id, "Admin connection registered");
    }

    /// Remove a closing connection from whichever collection holds it.
    ///
    /// Removal is by connection identity, not by participant id: if the entry
    /// under the id belongs to a newer connection (this one was superseded),
    /// this is a no-op. Returns whether an entry was actually removed, so the
    /// caller can tell a real departure from a stale close.
    pub fn unregister(&self, conn_id: ConnId, registration: &Registration) -> bool {
        let removed = match registration {
            Registration::Captain { captain_id } => self
                .captains
                .remove_if(captain_id, |_, reg| reg.conn_id == conn_id)
                .is_some(),
            Registration::Rider { rider_id } => self
                .riders
                .remove_if(rider_id, |_, reg| reg.conn_id == conn_id)
                .is_some(),
            Registration::Admin => self.admins.remove(&conn_id).is_some(),
        };
        tracing::debug!(?conn_id, removed, "Connection unregistered");
        removed
    }

    /// Current live sender for a captain id, if any.
    pub fn captain_sender(&self, captain_id: &str) -> Option<ConnectionSender> {
        self.captains.get(captain_id).map(|reg| reg.sender.clone())
    }

    /// Current live sender for a rider id, if any.
    pub fn rider_sender(&self, rider_id: &str) -> Option<ConnectionSender> {
        self.riders.get(rider_id).map(|reg| reg.sender.clone())
    }

    /// Senders for every connected admin observer.
    pub fn admin_senders(&self) -> Vec<ConnectionSender> {
        self.admins
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Ids of every currently-connected rider. Used by the periodic sweep.
    pub fn connected_riders(&self) -> Vec<String> {
        self.riders.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Whether a captain currently has a live connection. Used to filter the
    /// admin snapshot to captains that are actually online.
    pub fn is_captain_connected(&self, captain_id: &str) -> bool {
        self.captains.contains_key(captain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    fn sender() -> (ConnectionSender, mpsc::UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn reconnect_supersedes_prior_entry() {
        let registry = ConnectionRegistry::new();
        let (tx_old, _rx_old) = sender();
        let (tx_new, mut rx_new) = sender();

        let old_id = ConnId::next();
        let new_id = ConnId::next();
        registry.register_captain("c1", old_id, tx_old);
        registry.register_captain("c1", new_id, tx_new);

        // Exactly one entry, and it is the new connection
        let current = registry.captain_sender("c1").expect("captain registered");
        current.send(Message::Text("hi".into())).unwrap();
        assert!(rx_new.try_recv().is_ok());
    }

    #[test]
    fn stale_unregister_keeps_superseding_connection() {
        let registry = ConnectionRegistry::new();
        let (tx_old, _rx_old) = sender();
        let (tx_new, _rx_new) = sender();

        let old_id = ConnId::next();
        let new_id = ConnId::next();
        registry.register_rider("u1", old_id, tx_old);
        registry.register_rider("u1", new_id, tx_new);

        // The stale connection closes after being superseded: no-op
        let removed = registry.unregister(
            old_id,
            &Registration::Rider {
                rider_id: "u1".to_string(),
            },
        );
        assert!(!removed);
        assert!(registry.rider_sender("u1").is_some());

        // The current connection's own close removes it
        let removed = registry.unregister(
            new_id,
            &Registration::Rider {
                rider_id: "u1".to_string(),
            },
        );
        assert!(removed);
        assert!(registry.rider_sender("u1").is_none());
    }

    #[test]
    fn admins_accumulate_and_unregister_individually() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = sender();
        let (tx_b, _rx_b) = sender();

        let id_a = ConnId::next();
        let id_b = ConnId::next();
        registry.register_admin(id_a, tx_a);
        registry.register_admin(id_b, tx_b);
        assert_eq!(registry.admin_senders().len(), 2);

        registry.unregister(id_a, &Registration::Admin);
        assert_eq!(registry.admin_senders().len(), 1);
    }

    #[test]
    fn connected_riders_lists_live_ids() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = sender();
        let (tx2, _rx2) = sender();
        registry.register_rider("u1", ConnId::next(), tx1);
        registry.register_rider("u2", ConnId::next(), tx2);

        let mut riders = registry.connected_riders();
        riders.sort();
        assert_eq!(riders, vec!["u1".to_string(), "u2".to_string()]);
    }
}
