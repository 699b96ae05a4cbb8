//! # Marshals
//!
//! A marshal decides where a publish pass runs. `publish` packages the pass
//! as a [`Delivery`] and hands it over; the marshal must run it exactly once,
//! now or later, on whatever context it chooses.
//!
//! ```text
//!   publish(msg) ──► Delivery ──► Marshal::marshal
//!                                   │
//!                                   ├─ Immediate:     run() on the caller's thread
//!                                   ├─ closure:       caller-defined
//!                                   └─ QueuedMarshal: mpsc ──► DeliveryQueue::run()
//! ```

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::PublishError;

/// One pending publish pass.
///
/// Owns the message and the registry snapshot taken at publish time.
/// Consumed by [`Delivery::run`], so it can run at most once.
pub struct Delivery {
    message: &'static str,
    action: Box<dyn FnOnce() -> Result<usize, PublishError> + Send>,
}

impl Delivery {
    pub(crate) fn new<F>(message: &'static str, action: F) -> Self
    where
        F: FnOnce() -> Result<usize, PublishError> + Send + 'static,
    {
        Self {
            message,
            action: Box::new(action),
        }
    }

    /// Runs the pass. Returns the number of handlers invoked.
    pub fn run(self) -> Result<usize, PublishError> {
        (self.action)()
    }

    /// Type name of the message being delivered.
    pub fn message_type(&self) -> &'static str {
        self.message
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Controls the execution context of a publish pass.
pub trait Marshal {
    /// Takes ownership of `delivery` and runs it exactly once.
    ///
    /// Synchronous marshals return the pass's own result; deferring
    /// marshals return once the delivery is scheduled.
    fn marshal(&self, delivery: Delivery) -> Result<(), PublishError>;
}

/// Runs the delivery immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Marshal for Immediate {
    fn marshal(&self, delivery: Delivery) -> Result<(), PublishError> {
        delivery.run().map(|_| ())
    }
}

impl<F> Marshal for F
where
    F: Fn(Delivery) -> Result<(), PublishError>,
{
    fn marshal(&self, delivery: Delivery) -> Result<(), PublishError> {
        self(delivery)
    }
}

/// Creates a marshal that queues deliveries and the queue that runs them.
pub fn queued() -> (QueuedMarshal, DeliveryQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueuedMarshal { tx }, DeliveryQueue { rx })
}

/// Marshal that sends deliveries to a [`DeliveryQueue`].
///
/// Cloneable; the queue's `run` loop ends once every clone is dropped.
#[derive(Debug, Clone)]
pub struct QueuedMarshal {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl Marshal for QueuedMarshal {
    fn marshal(&self, delivery: Delivery) -> Result<(), PublishError> {
        self.tx.send(delivery).map_err(|rejected| {
            warn!(
                message = rejected.0.message_type(),
                "Delivery queue closed, message dropped"
            );
            PublishError::MarshalClosed
        })
    }
}

/// Receiving side of [`queued`]; owns the execution context of deliveries.
#[derive(Debug)]
pub struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl DeliveryQueue {
    /// Waits for the next queued delivery without running it.
    ///
    /// Returns `None` once all marshals are dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Runs every delivery queued so far, in order.
    ///
    /// Stops at the first failing pass and returns its error; later
    /// deliveries stay queued.
    pub fn run_pending(&mut self) -> Result<usize, PublishError> {
        let mut passes = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            delivery.run()?;
            passes += 1;
        }
        Ok(passes)
    }

    /// Runs deliveries until all marshals are dropped.
    ///
    /// Nobody is left to receive a failing pass's error here, so it is logged
    /// and the loop moves on to the next delivery.
    pub async fn run(mut self) -> usize {
        let mut passes = 0;
        while let Some(delivery) = self.rx.recv().await {
            let message = delivery.message_type();
            if let Err(e) = delivery.run() {
                warn!(message, error = %e, "Queued delivery failed");
            }
            passes += 1;
        }
        debug!(passes, "Delivery queue drained");
        passes
    }
}
