use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

struct Slot {
    tx: SyncSender<Map<String, Value>>,
    delivered: bool,
}

/// Outcome of handing an inbound response to the table.
#[derive(Debug, PartialEq)]
pub enum Delivery {
    /// A waiting caller received the response.
    Delivered,
    /// The id was already answered; the response was discarded.
    Duplicate,
    /// No caller is waiting on this id; the message is handed back.
    Unmatched(Map<String, Value>),
}

/// Correlation table mapping request ids to waiting callers.
#[derive(Clone, Default)]
pub struct PendingTable {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wait for `id`.
    ///
    /// The returned guard removes the entry when dropped, on every exit path.
    pub fn register(&self, id: impl Into<String>) -> PendingRequest {
        let id = id.into();
        let (tx, rx) = mpsc::sync_channel(1);
        self.lock().insert(
            id.clone(),
            Slot {
                tx,
                delivered: false,
            },
        );
        PendingRequest {
            id,
            rx,
            table: self.clone(),
        }
    }

    /// Hand an inbound response to the caller waiting on `id`.
    pub fn deliver(&self, id: &str, message: Map<String, Value>) -> Delivery {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(id) else {
            return Delivery::Unmatched(message);
        };
        if slot.delivered {
            return Delivery::Duplicate;
        }
        slot.delivered = true;
        match slot.tx.try_send(message) {
            Ok(()) => Delivery::Delivered,
            // Capacity is one and `delivered` guards the slot, so the only
            // failure left is a receiver that already went away.
            Err(mpsc::TrySendError::Full(message))
            | Err(mpsc::TrySendError::Disconnected(message)) => Delivery::Unmatched(message),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every sender so blocked callers wake with `ConnectionLost`.
    ///
    /// Entries themselves are removed by their guards.
    pub fn close_all(&self) {
        let mut slots = self.lock();
        let count = slots.len();
        for slot in slots.values_mut() {
            if !slot.delivered {
                // Swap in a sender whose receiver is already gone.
                let (tx, _) = mpsc::sync_channel(1);
                slot.tx = tx;
                slot.delivered = true;
            }
        }
        if count > 0 {
            tracing::debug!(count, "woke pending requests after disconnect");
        }
    }

    fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered wait; owned by exactly one caller.
pub struct PendingRequest {
    id: String,
    rx: Receiver<Map<String, Value>>,
    table: PendingTable,
}

impl PendingRequest {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Block until the response arrives, the deadline passes, or the
    /// connection drops.
    pub fn wait(self, timeout: Duration) -> Result<Map<String, Value>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(message),
            Err(RecvTimeoutError::Timeout) => Err(RelayError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(RelayError::ConnectionLost),
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn deliver_wakes_waiter() {
        let table = PendingTable::new();
        let pending = table.register("1");
        assert!(table.contains("1"));

        let outcome = table.deliver("1", map(json!({"id": "1", "status": "ok"})));
        assert_eq!(outcome, Delivery::Delivered);

        let message = pending.wait(Duration::from_secs(1)).unwrap();
        assert_eq!(message["status"], "ok");
        assert!(table.is_empty());
    }

    #[test]
    fn deliver_from_other_thread() {
        let table = PendingTable::new();
        let pending = table.register("7");
        let deliverer = table.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            deliverer.deliver("7", map(json!({"id": "7", "n": 1})))
        });

        let message = pending.wait(Duration::from_secs(2)).unwrap();
        assert_eq!(message["n"], 1);
        assert_eq!(handle.join().unwrap(), Delivery::Delivered);
    }

    #[test]
    fn second_delivery_is_duplicate() {
        let table = PendingTable::new();
        let pending = table.register("1");
        assert_eq!(
            table.deliver("1", map(json!({"id": "1", "n": 1}))),
            Delivery::Delivered
        );
        assert_eq!(
            table.deliver("1", map(json!({"id": "1", "n": 2}))),
            Delivery::Duplicate
        );
        let message = pending.wait(Duration::from_secs(1)).unwrap();
        assert_eq!(message["n"], 1);
    }

    #[test]
    fn unknown_id_is_handed_back() {
        let table = PendingTable::new();
        let outcome = table.deliver("99", map(json!({"id": "99"})));
        assert!(matches!(outcome, Delivery::Unmatched(m) if m["id"] == "99"));
    }

    #[test]
    fn timeout_removes_entry() {
        let table = PendingTable::new();
        let pending = table.register("1");
        let started = Instant::now();
        let err = pending.wait(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, RelayError::Timeout(_)));
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(!table.contains("1"));

        let late = table.deliver("1", map(json!({"id": "1"})));
        assert!(matches!(late, Delivery::Unmatched(_)));
    }

    #[test]
    fn dropped_guard_removes_entry() {
        let table = PendingTable::new();
        {
            let _pending = table.register("5");
            assert_eq!(table.len(), 1);
        }
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn close_all_wakes_waiters_with_connection_lost() {
        let table = PendingTable::new();
        let pending = table.register("1");
        let closer = table.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.close_all();
        });

        let started = Instant::now();
        let err = pending.wait(Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RelayError::ConnectionLost));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn close_all_does_not_drop_delivered_response() {
        let table = PendingTable::new();
        let pending = table.register("1");
        table.deliver("1", map(json!({"id": "1", "ok": true})));
        table.close_all();
        let message = pending.wait(Duration::from_secs(1)).unwrap();
        assert_eq!(message["ok"], true);
    }
}
