//! # Notification Publisher
//!
//! The operator side-channel. The kernel reports breaker trips here, the
//! loader reports health-check failures; an external alerting collaborator
//! subscribes.

use crate::subscriber::{NotificationFilter, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::{Notification, NotificationPriority};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Sink for operator notifications.
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Never fails; undeliverable notifications are
    /// logged and dropped.
    fn notify(&self, notification: Notification);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        log_notification(&notification);
    }
}

/// In-memory broadcast feed of notifications.
///
/// Uses `tokio::sync::broadcast`, so every subscriber sees every
/// notification published after it subscribed.
pub struct NotificationFeed {
    sender: broadcast::Sender<Notification>,
    published: AtomicU64,
    capacity: usize,
}

impl NotificationFeed {
    /// Create a feed with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a feed with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to notifications matching `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: NotificationFilter) -> Subscription {
        debug!(?filter, "New notification subscription");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total notifications published.
    #[must_use]
    pub fn notifications_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, notification: Notification) {
        log_notification(&notification);
        self.published.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.sender.send(notification) {
            debug!(module = %e.0.module_name, "Notification dropped (no subscribers)");
        }
    }
}

fn log_notification(notification: &Notification) {
    let module = notification.module_name.as_str();
    let kind = notification.notification_type;
    let message = notification.message.as_str();
    match notification.priority {
        NotificationPriority::Critical => error!(module, ?kind, "{message}"),
        NotificationPriority::High => warn!(module, ?kind, "{message}"),
        NotificationPriority::Medium | NotificationPriority::Low => info!(module, ?kind, "{message}"),
    }
}
