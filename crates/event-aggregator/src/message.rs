//! # Messages and Type Lineage
//!
//! A message's runtime type decides who receives it. Rust has no subtyping
//! between structs, so "is-a" is declared: a derived message embeds its base
//! and exposes it through `AsRef`, and [`impl_message!`] records the edge.
//!
//! ```text
//!   Lineage of `Move` (declared `Move => Input`, `Input => UiEvent`):
//!
//!   depth 0   Move        ─┐
//!   depth 1   Input        ├─ a handler for any of these receives a `Move`
//!   depth 2   UiEvent     ─┘
//! ```
//!
//! The aggregator walks the lineage from depth 0 upward, so the capability
//! closest to the message's own type is the one that fires.

use std::any::{type_name, Any, TypeId};

/// A value that can be published through the aggregator.
///
/// Plain messages need no code: `impl Message for Ping {}` or
/// `impl_message!(Ping, Pong)`. Messages with base types use
/// `impl_message!(Derived => Base)`.
pub trait Message: Any + Send + Sync {
    /// The message viewed as itself and as every declared base type.
    fn lineage(&self) -> Lineage<'_>
    where
        Self: Sized,
    {
        Lineage::root(self)
    }
}

/// One view of a message in its lineage.
#[derive(Clone, Copy)]
pub struct View<'a> {
    depth: usize,
    type_tag: TypeId,
    type_name: &'static str,
    value: &'a dyn Any,
}

impl<'a> View<'a> {
    /// Number of upcast hops from the published type.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Type tag of this view.
    ///
    /// Named apart from `Any::type_id`, which would otherwise win method
    /// resolution through `&View` and report the tag of the reference.
    pub fn type_tag(&self) -> TypeId {
        self.type_tag
    }

    /// Type name of this view, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The message seen as this view's type.
    pub fn value(&self) -> &'a dyn Any {
        self.value
    }
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("depth", &self.depth)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Every type a message is assignable to, most specific first.
///
/// Duplicate types reachable through several bases (diamonds) are kept once,
/// at their smallest depth.
#[derive(Debug, Clone)]
pub struct Lineage<'a> {
    views: Vec<View<'a>>,
}

impl<'a> Lineage<'a> {
    /// Lineage of a message with no declared bases.
    pub fn root<M: Message>(message: &'a M) -> Self {
        Self {
            views: vec![View {
                depth: 0,
                type_tag: TypeId::of::<M>(),
                type_name: type_name::<M>(),
                value: message,
            }],
        }
    }

    /// Adds `base` and its own lineage one level below the current root.
    #[must_use]
    pub fn with_base<B: Message>(mut self, base: &'a B) -> Self {
        for view in base.lineage().views {
            let depth = view.depth + 1;
            match self.views.iter_mut().find(|v| v.type_tag == view.type_tag) {
                Some(existing) if existing.depth <= depth => {}
                Some(existing) => existing.depth = depth,
                None => self.views.push(View { depth, ..view }),
            }
        }
        // Stable: equal depths keep declaration order
        self.views.sort_by_key(|v| v.depth);
        self
    }

    /// Views ordered from most to least specific.
    pub fn views(&self) -> &[View<'a>] {
        &self.views
    }

    /// The published type itself.
    pub fn most_specific(&self) -> &View<'a> {
        &self.views[0]
    }

    /// Whether the message is assignable to `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.find(TypeId::of::<T>()).is_some()
    }

    /// The view for `type_tag`, if the message is assignable to it.
    pub fn find(&self, type_tag: TypeId) -> Option<&View<'a>> {
        self.views.iter().find(|v| v.type_tag == type_tag)
    }
}

/// Implements [`Message`] for one or more types.
///
/// ```rust,ignore
/// struct Ping;
/// struct Pong;
/// impl_message!(Ping, Pong);
///
/// struct Input { x: i32 }
/// struct Click { input: Input }
/// impl AsRef<Input> for Click { fn as_ref(&self) -> &Input { &self.input } }
/// impl_message!(Input);
/// impl_message!(Click => Input);
/// ```
///
/// Base declarations must form a hierarchy. A cycle such as `A => B` with
/// `B => A` recurses without bound when the lineage is built and overflows
/// the stack on the first publish.
#[macro_export]
macro_rules! impl_message {
    ($ty:ty => $($base:ty),+ $(,)?) => {
        impl $crate::Message for $ty {
            fn lineage(&self) -> $crate::Lineage<'_> {
                $crate::Lineage::root(self)
                    $(.with_base(<Self as ::core::convert::AsRef<$base>>::as_ref(self)))+
            }
        }
    };
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::Message for $ty {})+
    };
}
