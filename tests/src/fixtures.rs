//! # Shared Fixtures
//!
//! A small message hierarchy and a counting subscriber reused by the
//! integration flows and the benchmarks.
//!
//! ```text
//! UiEvent ◄── Input ◄── Click
//!    ▲
//!    └─────── Resize
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use event_aggregator::{impl_message, Capabilities, Handle, Subscriber};

/// Root of the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct UiEvent {
    pub window: u32,
}

/// Any input event.
#[derive(Debug, Clone, Default)]
pub struct Input {
    pub ui: UiEvent,
    pub device: u8,
}

/// A mouse click.
#[derive(Debug, Clone, Default)]
pub struct Click {
    pub input: Input,
    pub x: i32,
    pub y: i32,
}

/// A window resize.
#[derive(Debug, Clone, Default)]
pub struct Resize {
    pub ui: UiEvent,
    pub width: u32,
    pub height: u32,
}

/// Not part of the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Tick(pub u64);

impl AsRef<UiEvent> for Input {
    fn as_ref(&self) -> &UiEvent {
        &self.ui
    }
}

impl AsRef<Input> for Click {
    fn as_ref(&self) -> &Input {
        &self.input
    }
}

impl AsRef<UiEvent> for Resize {
    fn as_ref(&self) -> &UiEvent {
        &self.ui
    }
}

impl_message!(UiEvent, Tick);
impl_message!(Input => UiEvent);
impl_message!(Click => Input);
impl_message!(Resize => UiEvent);

/// Click at `(x, y)` in window 1.
pub fn click(x: i32, y: i32) -> Click {
    Click {
        input: Input {
            ui: UiEvent { window: 1 },
            device: 0,
        },
        x,
        y,
    }
}

/// Counts every `UiEvent` and `Tick` it receives.
#[derive(Debug, Default)]
pub struct Tally {
    pub ui: AtomicUsize,
    pub ticks: AtomicUsize,
}

impl Tally {
    pub fn ui(&self) -> usize {
        self.ui.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Handle<UiEvent> for Tally {
    fn handle(&self, _: &UiEvent) -> anyhow::Result<()> {
        self.ui.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Handle<Tick> for Tally {
    fn handle(&self, _: &Tick) -> anyhow::Result<()> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Subscriber for Tally {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.handles::<UiEvent>().handles::<Tick>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_aggregator::Message;

    #[test]
    fn test_click_lineage() {
        let msg = click(1, 1);
        let lineage = msg.lineage();
        let names: Vec<_> = lineage.views().iter().map(|v| v.type_name()).collect();

        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("Click"));
        assert!(names[1].ends_with("Input"));
        assert!(names[2].ends_with("UiEvent"));
    }

    #[test]
    fn test_resize_is_not_input() {
        let msg = Resize::default();
        let lineage = msg.lineage();
        assert!(lineage.is::<UiEvent>());
        assert!(!lineage.is::<Input>());
    }
}
