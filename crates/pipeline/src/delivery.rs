//! Bookkeeping of received webhook deliveries.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::{DeliveryId, Timestamp};

/// One received delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Host-assigned delivery identifier.
    pub delivery_id: DeliveryId,
    /// When the listener accepted it.
    pub received_at: Timestamp,
}

/// Append-only, process-lifetime log of deliveries grouped by event type.
///
/// Cloning yields another handle to the same log.
#[derive(Debug, Clone, Default)]
pub struct DeliveryLog {
    inner: Arc<Mutex<HashMap<String, Vec<DeliveryRecord>>>>,
}

impl DeliveryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a delivery of `event_type`.
    pub fn record(&self, event_type: &str, delivery_id: DeliveryId) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(event_type.to_string())
            .or_default()
            .push(DeliveryRecord {
                delivery_id,
                received_at: Timestamp::now(),
            });
    }

    /// Number of deliveries received for `event_type`.
    pub fn count(&self, event_type: &str) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(event_type).map_or(0, Vec::len)
    }

    /// Per-event-type delivery counts, sorted by event type.
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.iter().map(|(k, v)| (k.clone(), v.len())).collect()
    }
}
