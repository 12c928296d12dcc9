//! Registry of connected application instances.
//!
//! Whoever owns a connection subscribes on join and unsubscribes on leave.
//! Broadcasts are fire-and-forget; receivers that have gone away are pruned.

use crate::control::Notification;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

pub type SubscriberId = u64;

#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<Notification>>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<Notification>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.insert(id, tx);
        tracing::debug!(subscriber = id, "subscriber joined");
        (id, rx)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "subscriber left");
        }
        removed
    }

    /// Deliver `notification` to every subscriber.
    ///
    /// Returns how many subscribers received it.
    pub async fn broadcast(&self, notification: &Notification) -> usize {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|id, tx| {
            let delivered = tx.send(notification.clone()).is_ok();
            if !delivered {
                tracing::debug!(subscriber = *id, "pruned closed subscriber");
            }
            delivered
        });
        subscribers.len()
    }
}
