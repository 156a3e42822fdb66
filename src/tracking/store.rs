//! In-memory last-known-location store.
//!
//! The single source of truth for "where is captain X right now." Holds at
//! most one sample per captain id; each update overwrites the previous one,
//! and a captain's entry is cleared when their connection closes. Location is
//! domain state keyed by id here — never a field on the transport object —
//! so replacing a connection cannot leave a dangling sample behind.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One position report from a captain. `lat`/`lng` are required; any other
/// metadata the driver app sends (heading, speed, accuracy, ...) rides along
/// in `extra` and is relayed untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LocationSample {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            extra: serde_json::Map::new(),
        }
    }
}

/// Last-known location per captain id.
#[derive(Debug, Default)]
pub struct LocationStore {
    samples: DashMap<String, LocationSample>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the captain's last-known location.
    pub fn set(&self, captain_id: &str, sample: LocationSample) {
        self.samples.insert(captain_id.to_string(), sample);
    }

    /// Last-known location for a captain, if one has been reported.
    pub fn get(&self, captain_id: &str) -> Option<LocationSample> {
        self.samples.get(captain_id).map(|entry| entry.value().clone())
    }

    /// Drop the captain's entry. Invoked when that captain's connection
    /// closes — there is no retention after disconnect.
    pub fn clear(&self, captain_id: &str) {
        self.samples.remove(captain_id);
    }

    /// Snapshot of every stored (captain id, sample) pair.
    /// Used for the admin initial snapshot.
    pub fn snapshot(&self) -> Vec<(String, LocationSample)> {
        self.samples
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
