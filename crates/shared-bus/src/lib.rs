//! # Shared Bus - Node Event Bus
//!
//! Carries the post-commit side effects of the block pipeline to whoever
//! listens: the notification publisher, the API layer, tests.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌──────────────┐
//! │ Block engine │ ────────────> │  Event Bus   │ ────────────> │  Listeners   │
//! └──────────────┘               └──────────────┘               └──────────────┘
//! ```
//!
//! Publishing never blocks and never fails the caller: with no listener the
//! event is dropped and logged, a lagging listener skips ahead.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, NodeEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
