//! # Event Aggregator - In-Process Publish/Subscribe
//!
//! Lets independent components exchange typed messages without holding
//! references to each other.
//!
//! ## Rules
//!
//! - **Weak subscribers:** the aggregator never keeps a subscriber alive;
//!   dropped subscribers are pruned on the next publish pass
//! - **Type-directed delivery:** a handler for `T` receives every message
//!   whose lineage contains `T`; the most specific capability wins
//! - **Subscription order:** recipients are visited in the order they subscribed
//! - **Fail loud:** a handler error stops the pass and reaches the publisher
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Component A │                    │  Component B │
//! │              │    publish()       │ Handle<Ping> │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐           │
//!                  │  Aggregator  │ ──────────┘
//!                  │  (registry)  │  handle(&Ping)
//!                  └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use event_aggregator::{impl_message, Capabilities, EventAggregator, Handle, Subscriber};
//!
//! struct Ping;
//! impl_message!(Ping);
//!
//! struct Echo;
//! impl Handle<Ping> for Echo {
//!     fn handle(&self, _: &Ping) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//! impl Subscriber for Echo {
//!     fn capabilities(caps: &mut Capabilities<Self>) {
//!         caps.handles::<Ping>();
//!     }
//! }
//!
//! let bus = EventAggregator::new();
//! let echo = Arc::new(Echo);
//! bus.subscribe(&echo);
//! bus.publish(Ping).unwrap();
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod marshal;
pub mod message;
mod registry;
pub mod subscriber;

// Re-export main types
pub use aggregator::{EventAggregator, SubscriptionGuard};
pub use config::AggregatorConfig;
pub use errors::{ConfigError, PublishError};
pub use marshal::{queued, Delivery, DeliveryQueue, Immediate, Marshal, QueuedMarshal};
pub use message::{Lineage, Message, View};
pub use subscriber::{Capabilities, Handle, Subscriber};
