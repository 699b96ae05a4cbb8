//! # Subscription Registry
//!
//! Ordered list of subscriber entries behind a single mutex. The lock guards
//! membership changes and snapshot taking only; delivery runs on a snapshot
//! with the lock released, so handlers may call back into the aggregator.
//!
//! Entries hold their subscriber through a `Weak`. Identity checks under the
//! lock compare allocation addresses and strong counts instead of upgrading,
//! so a subscriber's `Drop` never runs while the lock is held.

use std::any::{type_name, Any};
use std::sync::{Arc, Weak};

use aggregator_telemetry::{DELIVERIES, HANDLER_FAILURES, SUBSCRIBERS_PRUNED};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::errors::PublishError;
use crate::message::{Lineage, View};
use crate::subscriber::{Capabilities, Capability, Subscriber};

/// Address of a subscriber allocation, used as its identity.
pub(crate) type TargetPtr = *const ();

pub(crate) fn target_ptr<S: Subscriber>(subscriber: &Arc<S>) -> TargetPtr {
    Arc::as_ptr(subscriber).cast()
}

/// A registered subscriber.
pub(crate) struct Entry {
    target: Weak<dyn Any + Send + Sync>,
    subscriber: &'static str,
    capabilities: Vec<Capability>,
}

/// What happened when an entry was offered a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// A handler ran.
    Delivered,
    /// The subscriber is alive but handles none of the message's types.
    Skipped,
    /// The subscriber has been dropped.
    Dead,
}

impl Entry {
    fn new<S: Subscriber>(subscriber: &Arc<S>) -> Self {
        let strong: Arc<dyn Any + Send + Sync> = subscriber.clone();
        Self {
            target: Arc::downgrade(&strong),
            subscriber: type_name::<S>(),
            capabilities: Capabilities::<S>::collect(),
        }
    }

    /// Whether this entry's target is alive and is the allocation at `ptr`.
    fn is_live_target(&self, ptr: TargetPtr) -> bool {
        self.target.strong_count() > 0 && Weak::as_ptr(&self.target).cast::<()>() == ptr
    }

    fn is_dead(&self) -> bool {
        self.target.strong_count() == 0
    }

    /// The capability closest to the message's own type.
    fn best_match<'l, 'a>(
        &self,
        lineage: &'l Lineage<'a>,
    ) -> Option<(&Capability, &'l View<'a>)> {
        lineage.views().iter().find_map(|view| {
            self.capabilities
                .iter()
                .find(|cap| cap.message_type == view.type_tag())
                .map(|cap| (cap, view))
        })
    }

    /// Offers one message to this entry. Runs without the registry lock.
    pub(crate) fn deliver(&self, lineage: &Lineage<'_>) -> Result<Outcome, PublishError> {
        let Some(target) = self.target.upgrade() else {
            return Ok(Outcome::Dead);
        };
        let Some((capability, view)) = self.best_match(lineage) else {
            return Ok(Outcome::Skipped);
        };

        trace!(
            subscriber = self.subscriber,
            handler = capability.message_name,
            message = lineage.most_specific().type_name(),
            "Delivering message"
        );
        DELIVERIES.inc();

        (capability.invoke)(&*target, view.value()).map_err(|source| {
            HANDLER_FAILURES.inc();
            warn!(
                subscriber = self.subscriber,
                handler = capability.message_name,
                error = %source,
                "Handler failed, aborting delivery pass"
            );
            PublishError::Handler {
                subscriber: self.subscriber,
                message: capability.message_name,
                source,
            }
        })?;

        Ok(Outcome::Delivered)
    }
}

/// The subscriber list.
pub(crate) struct Registry {
    entries: Mutex<Vec<Arc<Entry>>>,
}

impl Registry {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Appends an entry unless this exact live instance is already present.
    pub(crate) fn insert<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        let ptr = target_ptr(subscriber);
        // Capabilities are collected before locking; the declaration is user code.
        let entry = Arc::new(Entry::new(subscriber));

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.is_live_target(ptr)) {
            return false;
        }
        debug!(
            subscriber = entry.subscriber,
            capabilities = ?entry.capabilities,
            "Subscriber registered"
        );
        entries.push(entry);
        true
    }

    /// Removes the first entry whose live target is the allocation at `ptr`.
    pub(crate) fn remove(&self, ptr: TargetPtr) -> bool {
        let mut entries = self.entries.lock();
        let Some(index) = entries.iter().position(|e| e.is_live_target(ptr)) else {
            return false;
        };
        let entry = entries.remove(index);
        debug!(subscriber = entry.subscriber, "Subscriber removed");
        true
    }

    pub(crate) fn contains(&self, ptr: TargetPtr) -> bool {
        self.entries.lock().iter().any(|e| e.is_live_target(ptr))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Copy of the current entry list.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Entry>> {
        self.entries.lock().clone()
    }

    /// Removes the given entries, compared by identity.
    pub(crate) fn remove_entries(&self, dead: &[Arc<Entry>]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !dead.iter().any(|d| Arc::ptr_eq(d, e)));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            SUBSCRIBERS_PRUNED.inc_by(removed as f64);
            debug!(removed, "Pruned dead subscribers");
        }
        removed
    }

    /// Removes every entry whose subscriber has been dropped.
    pub(crate) fn prune(&self) -> usize {
        let dead: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.is_dead())
            .cloned()
            .collect();
        self.remove_entries(&dead)
    }

    /// One delivery pass over `snapshot`.
    ///
    /// Stops at the first handler error. Entries found dead before that
    /// point are pruned either way.
    pub(crate) fn deliver(
        &self,
        snapshot: &[Arc<Entry>],
        lineage: &Lineage<'_>,
    ) -> Result<usize, PublishError> {
        let mut dead = Vec::new();
        let mut delivered = 0;
        let mut result = Ok(());

        for entry in snapshot {
            match entry.deliver(lineage) {
                Ok(Outcome::Delivered) => delivered += 1,
                Ok(Outcome::Skipped) => {}
                Ok(Outcome::Dead) => dead.push(Arc::clone(entry)),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.remove_entries(&dead);
        result.map(|()| delivered)
    }
}
