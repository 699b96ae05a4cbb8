//! # Subscribers
//!
//! A subscriber declares, once, which message types it handles. The
//! declaration becomes an ordered capability list of `(type tag, invoke fn)`
//! pairs stored in the registry entry; no type inspection happens afterwards.
//!
//! ```rust,ignore
//! struct Status;
//!
//! impl Handle<Ping> for Status {
//!     fn handle(&self, _: &Ping) -> anyhow::Result<()> { Ok(()) }
//! }
//! impl Handle<Pong> for Status {
//!     fn handle(&self, _: &Pong) -> anyhow::Result<()> { Ok(()) }
//! }
//!
//! impl Subscriber for Status {
//!     fn capabilities(caps: &mut Capabilities<Self>) {
//!         caps.handles::<Ping>().handles::<Pong>();
//!     }
//! }
//! ```

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;

use crate::message::Message;

/// Receives messages of type `T`.
///
/// A type may implement `Handle` for any number of message types.
pub trait Handle<T: Message>: Send + Sync + 'static {
    /// Handles one message. An error aborts the current publish pass and is
    /// returned to the publisher.
    fn handle(&self, message: &T) -> anyhow::Result<()>;
}

/// Something that can be registered with the aggregator.
pub trait Subscriber: Send + Sync + 'static {
    /// Declares the message types this subscriber handles.
    ///
    /// The default declares nothing; such a subscriber is registered but
    /// never receives anything.
    fn capabilities(caps: &mut Capabilities<Self>)
    where
        Self: Sized,
    {
        let _ = caps;
    }
}

pub(crate) type Invoke = fn(&(dyn Any + Send + Sync), &dyn Any) -> anyhow::Result<()>;

/// One handled message type of a subscriber.
#[derive(Clone, Copy)]
pub(crate) struct Capability {
    pub(crate) message_type: TypeId,
    pub(crate) message_name: &'static str,
    pub(crate) invoke: Invoke,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("message", &self.message_name)
            .finish()
    }
}

/// Builder for a subscriber's capability list.
pub struct Capabilities<S> {
    entries: Vec<Capability>,
    _subscriber: PhantomData<fn(&S)>,
}

impl<S: Subscriber> Capabilities<S> {
    pub(crate) fn collect() -> Vec<Capability> {
        let mut caps = Self {
            entries: Vec::new(),
            _subscriber: PhantomData,
        };
        S::capabilities(&mut caps);
        caps.entries
    }

    /// Declares that `S` handles `T`. Declaring the same type twice has no
    /// further effect.
    pub fn handles<T: Message>(&mut self) -> &mut Self
    where
        S: Handle<T>,
    {
        let message_type = TypeId::of::<T>();
        if !self.entries.iter().any(|c| c.message_type == message_type) {
            self.entries.push(Capability {
                message_type,
                message_name: type_name::<T>(),
                invoke: invoke::<S, T>,
            });
        }
        self
    }
}

/// Monomorphised entry point stored in a [`Capability`]. The registry keys
/// capabilities by `TypeId`, so both downcasts succeed whenever it is called.
fn invoke<S, T>(target: &(dyn Any + Send + Sync), message: &dyn Any) -> anyhow::Result<()>
where
    S: Handle<T>,
    T: Message,
{
    match (target.downcast_ref::<S>(), message.downcast_ref::<T>()) {
        (Some(subscriber), Some(message)) => subscriber.handle(message),
        _ => Err(anyhow::anyhow!(
            "capability {} of {} invoked with a mismatched target or message",
            type_name::<T>(),
            type_name::<S>()
        )),
    }
}
