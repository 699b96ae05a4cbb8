//! # Re-entrant Handlers
//!
//! Handlers run outside the registry lock, so they may subscribe,
//! unsubscribe and publish on the same aggregator. Membership changes made
//! during a pass do not affect that pass's recipient set.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};

    use event_aggregator::{impl_message, Capabilities, EventAggregator, Handle, Subscriber};
    use parking_lot::Mutex;

    use crate::fixtures::{Tally, Tick};

    struct Announce;
    struct Echo(u32);
    impl_message!(Announce, Echo);

    /// On `Announce`, subscribes a newcomer and re-publishes as `Echo`.
    struct Recruiter {
        bus: EventAggregator,
        newcomer: Arc<Tally>,
        echoes: Mutex<Vec<u32>>,
    }

    impl Handle<Announce> for Recruiter {
        fn handle(&self, _: &Announce) -> anyhow::Result<()> {
            self.bus.subscribe(&self.newcomer);
            self.bus.publish(Echo(1))?;
            Ok(())
        }
    }

    impl Handle<Echo> for Recruiter {
        fn handle(&self, echo: &Echo) -> anyhow::Result<()> {
            self.echoes.lock().push(echo.0);
            Ok(())
        }
    }

    impl Subscriber for Recruiter {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.handles::<Announce>().handles::<Echo>();
        }
    }

    #[test]
    fn test_handler_can_subscribe_and_publish() {
        let bus = EventAggregator::new();
        let recruiter = Arc::new(Recruiter {
            bus: bus.clone(),
            newcomer: Arc::new(Tally::default()),
            echoes: Mutex::new(Vec::new()),
        });
        bus.subscribe(&recruiter);

        bus.publish(Announce).unwrap();

        assert_eq!(*recruiter.echoes.lock(), vec![1]);
        assert!(bus.is_subscribed(&recruiter.newcomer));
        assert_eq!(bus.subscriber_count(), 2);
    }

    /// Unsubscribes a later subscriber while handling `Tick`.
    struct Bouncer {
        bus: EventAggregator,
        victim: Weak<Tally>,
    }

    impl Handle<Tick> for Bouncer {
        fn handle(&self, _: &Tick) -> anyhow::Result<()> {
            if let Some(victim) = self.victim.upgrade() {
                self.bus.unsubscribe(&victim);
            }
            Ok(())
        }
    }

    impl Subscriber for Bouncer {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.handles::<Tick>();
        }
    }

    #[test]
    fn test_unsubscribe_during_pass_uses_snapshot() {
        let bus = EventAggregator::new();
        let victim = Arc::new(Tally::default());
        let bouncer = Arc::new(Bouncer {
            bus: bus.clone(),
            victim: Arc::downgrade(&victim),
        });
        bus.subscribe(&bouncer);
        bus.subscribe(&victim);

        // The victim was in the snapshot, so it still receives this one.
        bus.publish(Tick(1)).unwrap();
        assert_eq!(victim.ticks(), 1);
        assert!(!bus.is_subscribed(&victim));

        bus.publish(Tick(2)).unwrap();
        assert_eq!(victim.ticks(), 1);
    }

    /// Drops the last strong reference to itself from inside its handler.
    struct SelfDestruct {
        slot: Mutex<Option<Arc<SelfDestruct>>>,
    }

    impl Handle<Tick> for SelfDestruct {
        fn handle(&self, _: &Tick) -> anyhow::Result<()> {
            self.slot.lock().take();
            Ok(())
        }
    }

    impl Subscriber for SelfDestruct {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.handles::<Tick>();
        }
    }

    #[test]
    fn test_subscriber_released_during_its_own_handler() {
        let bus = EventAggregator::new();
        let doomed = Arc::new(SelfDestruct {
            slot: Mutex::new(None),
        });
        *doomed.slot.lock() = Some(Arc::clone(&doomed));
        bus.subscribe(&doomed);
        let weak = Arc::downgrade(&doomed);
        drop(doomed);

        // The pass holds a temporary strong handle while the handler runs.
        bus.publish(Tick(1)).unwrap();
        assert!(weak.upgrade().is_none());

        bus.publish(Tick(2)).unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
