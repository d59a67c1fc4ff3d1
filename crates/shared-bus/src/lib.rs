//! # Shared Bus - Authorizing Event Kernel
//!
//! Every module-to-module call in the CMS passes through the [`TrustKernel`].
//!
//! ## Call Flow
//!
//! ```text
//! ┌──────────────┐   emit(event, payload, reply)   ┌──────────────┐
//! │  Module A    │ ──────────────┐                 │  Module B    │
//! │              │               │                 │  (listener)  │
//! └──────────────┘               ▼                 └──────────────┘
//!        ▲               ┌──────────────┐                 ▲
//!        │               │ TrustKernel  │  forward        │
//!        │               │ identity     │ ────────────────┘
//!        │   reply       │ latch        │
//!        └───────────────│ token/secret │
//!                        └──────────────┘
//!                               │ trip
//!                               ▼
//!                        Notifier (operators)
//! ```
//!
//! ## Security
//!
//! - **Identity first:** calls without a valid `moduleName` never reach a listener.
//! - **Meltdown latch:** one authentication failure excludes the module for the
//!   rest of the process, and its listeners are swept.
//! - **Single-fire replies:** a [`Reply`] resolves its caller at most once.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod kernel;
pub mod latch;
pub mod publisher;
pub mod reply;
pub mod subscriber;

// Re-export main types
pub use events::{is_bootstrap_allowed, EventName, BOOTSTRAP_ALLOWLIST, PUBLIC_EVENTS};
pub use kernel::{Handler, KernelHandle, ListenerId, TrustKernel};
pub use latch::{MeltdownLatch, MeltdownRecord};
pub use publisher::{NotificationFeed, Notifier, TracingNotifier};
pub use reply::{Reply, ReplyReceiver};
pub use subscriber::{NotificationFilter, Subscription, SubscriptionError};

/// Notifications buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
