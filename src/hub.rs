//! Live broadcast hub.
//!
//! Owns the set of connected realtime subscribers and fans newly accepted
//! measurements out to all of them, best-effort. The raw subscriber map is
//! never exposed; the only operations are `subscribe`, `unsubscribe` and
//! `broadcast`.
//!
//! Delivery is at-most-once: a subscriber that connects after an event was
//! broadcast never sees it, and there is no backlog or replay. A subscriber
//! whose channel is closed is evicted during the broadcast that discovers
//! it; one dead subscriber never blocks delivery to the rest and never
//! surfaces an error to the broadcaster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::LiveEvent;

// ---

pub struct Hub {
    // ---
    subscribers: RwLock<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
    subscriber_count: AtomicU64,
}

impl Hub {
    /// Create an empty hub.
    pub fn new() -> Self {
        // ---
        Self {
            subscribers: RwLock::new(HashMap::new()),
            subscriber_count: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber.
    ///
    /// Returns the subscriber's handle and the receiving end of its event
    /// channel. The channel is unbounded so `broadcast` never awaits a slow
    /// consumer; backpressure is the transport layer's problem.
    pub async fn subscribe(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        // ---
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, tx);
        }
        self.subscriber_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(subscriber_id = %id, "Live subscriber registered");
        (id, rx)
    }

    /// Remove a subscriber. Idempotent: removing an absent handle is a no-op.
    pub async fn unsubscribe(&self, id: &Uuid) {
        // ---
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(id).is_some() {
            self.subscriber_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(subscriber_id = %id, "Live subscriber removed");
        }
    }

    /// Deliver `event` to every current subscriber, best-effort.
    ///
    /// The event is serialized once. Delivery runs under the read lock so
    /// concurrent subscribes/unsubscribes never observe a torn set; handles
    /// whose channel has closed are collected and evicted afterwards under
    /// the write lock.
    pub async fn broadcast(&self, event: &LiveEvent) {
        // ---
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize live event");
                return;
            }
        };

        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            tracing::debug!(
                subscriber_count = subscribers.len(),
                "Broadcasting measurement to live subscribers"
            );
            for (id, tx) in subscribers.iter() {
                if tx.send(json.clone()).is_err() {
                    tracing::warn!(subscriber_id = %id, "Subscriber channel closed, evicting");
                    dead.push(*id);
                }
            }
        }

        for id in &dead {
            self.unsubscribe(id).await;
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> u64 {
        // ---
        self.subscriber_count.load(Ordering::Relaxed)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
