//! # Notification Subscriber
//!
//! Receiving side of the [`NotificationFeed`](crate::NotificationFeed).

use shared_types::{Notification, NotificationPriority, NotificationType};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The feed was dropped.
    #[error("Notification feed closed")]
    Closed,
}

/// Which notifications a subscription wants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Empty means every type.
    pub types: Vec<NotificationType>,
    /// Lowest priority delivered.
    pub min_priority: Option<NotificationPriority>,
    /// Only this module.
    pub module_name: Option<String>,
}

impl NotificationFilter {
    /// Everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the given types.
    #[must_use]
    pub fn types(types: Vec<NotificationType>) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }

    /// Restrict to `module_name`.
    #[must_use]
    pub fn for_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    /// Drop anything below `priority`.
    #[must_use]
    pub fn at_least(mut self, priority: NotificationPriority) -> Self {
        self.min_priority = Some(priority);
        self
    }

    /// Whether `notification` passes the filter.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        (self.types.is_empty() || self.types.contains(&notification.notification_type))
            && self.min_priority.map_or(true, |min| notification.priority >= min)
            && self
                .module_name
                .as_deref()
                .map_or(true, |name| name == notification.module_name)
    }
}

/// A subscription handle.
pub struct Subscription {
    receiver: broadcast::Receiver<Notification>,
    filter: NotificationFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<Notification>, filter: NotificationFilter) -> Self {
        Self { receiver, filter }
    }

    /// Next matching notification, or `None` once the feed is dropped.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            let notification = match self.receiver.recv().await {
                Ok(n) => n,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some notifications dropped");
                    continue;
                }
            };

            if self.filter.matches(&notification) {
                return Some(notification);
            }
        }
    }

    /// Non-blocking receive. `Ok(None)` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Result<Option<Notification>, SubscriptionError> {
        loop {
            let notification = match self.receiver.try_recv() {
                Ok(n) => n,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&notification) {
                return Ok(Some(notification));
            }
        }
    }

    /// Drain every matching notification currently queued.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(Some(notification)) = self.try_recv() {
            drained.push(notification);
        }
        drained
    }

    /// The filter.
    #[must_use]
    pub fn filter(&self) -> &NotificationFilter {
        &self.filter
    }
}
