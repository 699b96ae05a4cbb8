//! # Concurrency
//!
//! Subscribe/unsubscribe/publish from many threads at once against one
//! aggregator.

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use event_aggregator::EventAggregator;
    use rand::Rng;

    use crate::fixtures::{click, Tally, Tick};

    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    #[test]
    fn test_concurrent_subscribe_is_idempotent() {
        let bus = EventAggregator::new();
        let tally = Arc::new(Tally::default());
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    bus.subscribe(&tally);
                });
            }
        });

        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(Tick(1)).unwrap();
        assert_eq!(tally.ticks(), 1);
    }

    #[test]
    fn test_publish_while_membership_churns() {
        let bus = EventAggregator::new();
        let steady = Arc::new(Tally::default());
        bus.subscribe(&steady);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for worker in 0..THREADS {
                let bus = bus.clone();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    let mut rng = rand::thread_rng();
                    for round in 0..ROUNDS {
                        if worker % 2 == 0 {
                            let transient = Arc::new(Tally::default());
                            bus.subscribe(&transient);
                            if rng.gen_bool(0.5) {
                                bus.unsubscribe(&transient);
                            }
                            // Otherwise dropped here and pruned by a later publish
                        } else {
                            bus.publish(Tick(round as u64)).unwrap();
                        }
                    }
                });
            }
        });

        let publishers = THREADS / 2;
        assert_eq!(steady.ticks(), publishers * ROUNDS);

        // All transient subscribers are gone; one more pass sweeps the rest.
        bus.publish(Tick(0)).unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.is_subscribed(&steady));
    }

    #[test]
    fn test_parallel_publishers_each_deliver_once() {
        let bus = EventAggregator::new();
        let tallies: Vec<_> = (0..4).map(|_| Arc::new(Tally::default())).collect();
        for tally in &tallies {
            bus.subscribe(tally);
        }

        thread::scope(|s| {
            for _ in 0..THREADS {
                let bus = bus.clone();
                s.spawn(move || {
                    for _ in 0..ROUNDS {
                        bus.publish(click(1, 2)).unwrap();
                    }
                });
            }
        });

        for tally in &tallies {
            assert_eq!(tally.ui.load(Ordering::SeqCst), THREADS * ROUNDS);
        }
        assert_eq!(bus.events_published(), (THREADS * ROUNDS) as u64);
    }
}
