//! Push side of the notifications table.
//!
//! Any change to a user's notifications is announced as that user's id on a
//! broadcast channel. Subscribers filter by their own id, so a browser tab
//! only re-counts when something changed for its user.

use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{Store, StoreResult};

/// Postgres channel the notifications trigger publishes on.
pub const NOTIFICATIONS_CHANNEL: &str = "notifications_changed";

const HUB_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Uuid>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, user_id: Uuid) {
        // No subscribers is the common case and not an error.
        let _ = self.sender.send(user_id);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Uuid> {
        self.sender.subscribe()
    }
}

/// Unread count for `user_id`: once immediately, then again after every
/// change announced for that user. Ends when the hub is dropped.
pub fn unread_counts(
    store: Arc<dyn Store>,
    hub: &NotificationHub,
    user_id: Uuid,
) -> impl Stream<Item = StoreResult<i64>> + Send {
    let receiver = hub.subscribe();

    stream::unfold(
        (store, receiver, true),
        move |(store, mut receiver, first)| async move {
            if !first {
                loop {
                    match receiver.recv().await {
                        Ok(changed) if changed == user_id => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            // Some events were dropped; one of them may have been ours.
                            debug!(skipped, %user_id, "Realtime: subscriber lagged");
                            break;
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }

            let count = store.unread_count(user_id).await;
            if let Err(e) = &count {
                warn!(error = ?e, %user_id, "Realtime: unread count refresh failed");
            }
            Some((count, (store, receiver, false)))
        },
    )
}
