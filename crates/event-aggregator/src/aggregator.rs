//! # Event Aggregator
//!
//! The dispatcher. Subscribers register once; publishers broadcast a value;
//! every live subscriber with a capability matching the value's lineage gets
//! it, in subscription order, at most once per publish.
//!
//! ## Publish pass
//!
//! ```text
//!   publish_with(msg, marshal)
//!     ├─ lock, clone entry list, unlock          (snapshot)
//!     └─ marshal.marshal(Delivery)
//!           └─ Delivery::run()
//!                ├─ for entry in snapshot:
//!                │     ├─ target dropped      ─► mark dead
//!                │     ├─ no capability match ─► skip
//!                │     └─ best match          ─► Handle::handle(&T)
//!                │                                 └─ Err ─► stop pass
//!                └─ lock, remove entries marked dead, unlock
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use aggregator_telemetry::{HistogramTimer, DELIVERY_DURATION, MESSAGES_PUBLISHED};
use lazy_static::lazy_static;
use tracing::debug;

use crate::config::AggregatorConfig;
use crate::errors::PublishError;
use crate::marshal::{Delivery, Immediate, Marshal};
use crate::message::Message;
use crate::registry::{target_ptr, Registry};
use crate::subscriber::Subscriber;

lazy_static! {
    static ref GLOBAL: EventAggregator = EventAggregator::with_config(AggregatorConfig::from_env());
}

struct Inner {
    config: AggregatorConfig,
    registry: Registry,
    events_published: AtomicU64,
}

/// In-process publish/subscribe dispatcher.
///
/// Cheap to clone; clones share one registry. Subscribers are held weakly:
/// subscribing never keeps an instance alive.
#[derive(Clone)]
pub struct EventAggregator {
    inner: Arc<Inner>,
}

impl EventAggregator {
    /// Create an aggregator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AggregatorConfig::default())
    }

    /// Create an aggregator with the given configuration.
    #[must_use]
    pub fn with_config(config: AggregatorConfig) -> Self {
        let registry = Registry::with_capacity(config.initial_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                events_published: AtomicU64::new(0),
            }),
        }
    }

    /// Process-wide aggregator, configured from the environment on first use.
    pub fn global() -> &'static EventAggregator {
        &GLOBAL
    }

    /// Registers `subscriber` with the capabilities it declares.
    ///
    /// Returns `false` if this instance is already subscribed.
    pub fn subscribe<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        let added = self.inner.registry.insert(subscriber);
        if !added {
            debug!(
                aggregator = %self.inner.config.name,
                subscriber = type_name::<S>(),
                "Already subscribed"
            );
        }
        added
    }

    /// Subscribes and returns a guard that unsubscribes on drop.
    ///
    /// If the instance was already subscribed, the guard takes over that
    /// subscription.
    pub fn subscribe_scoped<S: Subscriber>(&self, subscriber: &Arc<S>) -> SubscriptionGuard {
        self.subscribe(subscriber);
        let target: Arc<dyn Any + Send + Sync> = subscriber.clone();
        SubscriptionGuard {
            aggregator: Arc::downgrade(&self.inner),
            target: Arc::downgrade(&target),
            subscriber: type_name::<S>(),
        }
    }

    /// Removes `subscriber`. Returns `false` if it was not subscribed.
    pub fn unsubscribe<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        self.inner.registry.remove(target_ptr(subscriber))
    }

    /// Whether this exact instance is currently subscribed.
    pub fn is_subscribed<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        self.inner.registry.contains(target_ptr(subscriber))
    }

    /// Publishes `message` to all matching subscribers on the calling thread.
    ///
    /// Equivalent to `publish_with(message, &Immediate)`.
    pub fn publish<M: Message>(&self, message: M) -> Result<(), PublishError> {
        self.publish_with(message, &Immediate)
    }

    /// Publishes `message`, letting `marshal` choose where delivery runs.
    ///
    /// The recipient set is fixed when this is called; subscriptions made
    /// afterwards, including from inside handlers, do not see this message.
    pub fn publish_with<M, K>(&self, message: M, marshal: &K) -> Result<(), PublishError>
    where
        M: Message,
        K: Marshal + ?Sized,
    {
        let message_type = type_name::<M>();
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        MESSAGES_PUBLISHED.with_label_values(&[message_type]).inc();

        let snapshot = self.inner.registry.snapshot();
        debug!(
            aggregator = %self.inner.config.name,
            message = message_type,
            candidates = snapshot.len(),
            "Publishing message"
        );

        let inner = Arc::clone(&self.inner);
        let delivery = Delivery::new(message_type, move || {
            let _timer = HistogramTimer::new(&DELIVERY_DURATION);
            let lineage = message.lineage();
            let delivered = inner.registry.deliver(&snapshot, &lineage)?;
            debug!(
                aggregator = %inner.config.name,
                message = message_type,
                delivered,
                "Message delivered"
            );
            Ok(delivered)
        });

        marshal.marshal(delivery)
    }

    /// Removes entries whose subscriber has been dropped, without publishing.
    pub fn prune(&self) -> usize {
        self.inner.registry.prune()
    }

    /// Entries currently held, including dropped subscribers not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Total calls to `publish`/`publish_with`.
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    /// This aggregator's configuration.
    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventAggregator")
            .field("name", &self.inner.config.name)
            .field("subscribers", &self.subscriber_count())
            .field("events_published", &self.events_published())
            .finish()
    }
}

/// Unsubscribes its subscriber when dropped.
///
/// Holds neither the aggregator nor the subscriber alive.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    aggregator: Weak<Inner>,
    target: Weak<dyn Any + Send + Sync>,
    subscriber: &'static str,
}

impl SubscriptionGuard {
    /// Unsubscribes now. Returns `false` if the subscription was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        let Some(inner) = std::mem::take(&mut self.aggregator).upgrade() else {
            return false;
        };
        let removed = inner.registry.remove(Weak::as_ptr(&self.target).cast());
        debug!(
            aggregator = %inner.config.name,
            subscriber = self.subscriber,
            removed,
            "Subscription guard released"
        );
        removed
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("subscriber", &self.subscriber)
            .field("active", &(self.aggregator.strong_count() > 0))
            .finish()
    }
}
