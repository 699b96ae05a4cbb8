//! # Aggregator Demo
//!
//! Two components talk through the aggregator without knowing each other:
//!
//! ```text
//!   main ──publish(Keystroke)──► Aggregator ──► Editor   (Handle<Keystroke>)
//!     │                              │
//!     └──publish_with(Saved, ui)─────┘──► DeliveryQueue ──► StatusBar (Handle<DocumentEvent>)
//!                                          (ui task)
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load telemetry and aggregator configuration from env
//! 2. Spawn the UI task that drains queued deliveries
//! 3. Subscribe components, publish, shut down
//! 4. Print Prometheus metrics

use std::sync::Arc;

use aggregator_telemetry::{init_telemetry, TelemetryConfig};
use anyhow::{Context, Result};
use event_aggregator::{
    impl_message, queued, AggregatorConfig, Capabilities, EventAggregator, Handle, Subscriber,
};
use parking_lot::Mutex;
use tracing::info;

/// Something happened to the open document.
#[derive(Debug, Clone)]
struct DocumentEvent {
    path: String,
}

/// The document was written to disk.
#[derive(Debug, Clone)]
struct Saved {
    document: DocumentEvent,
    bytes: usize,
}

/// A key was typed.
#[derive(Debug, Clone)]
struct Keystroke(char);

impl AsRef<DocumentEvent> for Saved {
    fn as_ref(&self) -> &DocumentEvent {
        &self.document
    }
}

impl_message!(DocumentEvent, Keystroke);
impl_message!(Saved => DocumentEvent);

/// Buffers keystrokes.
#[derive(Default)]
struct Editor {
    buffer: Mutex<String>,
}

impl Handle<Keystroke> for Editor {
    fn handle(&self, key: &Keystroke) -> anyhow::Result<()> {
        self.buffer.lock().push(key.0);
        Ok(())
    }
}

impl Subscriber for Editor {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.handles::<Keystroke>();
    }
}

/// Shows the last document event; only touched from the UI task.
#[derive(Default)]
struct StatusBar {
    text: Mutex<String>,
}

impl Handle<DocumentEvent> for StatusBar {
    fn handle(&self, event: &DocumentEvent) -> anyhow::Result<()> {
        *self.text.lock() = format!("{}: changed", event.path);
        Ok(())
    }
}

impl Handle<Saved> for StatusBar {
    fn handle(&self, saved: &Saved) -> anyhow::Result<()> {
        *self.text.lock() = format!("{}: saved {} bytes", saved.document.path, saved.bytes);
        Ok(())
    }
}

impl Subscriber for StatusBar {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.handles::<DocumentEvent>().handles::<Saved>();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::for_service("aggregator-demo");
    let guard = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = AggregatorConfig::try_from_env().context("invalid aggregator configuration")?;
    let bus = EventAggregator::with_config(config);

    let (ui, queue) = queued();
    let ui_task = tokio::spawn(queue.run());

    let editor = Arc::new(Editor::default());
    let status = Arc::new(StatusBar::default());
    bus.subscribe(&editor);
    bus.subscribe(&status);

    for key in "hello".chars() {
        bus.publish(Keystroke(key))?;
    }
    let bytes = editor.buffer.lock().len();
    bus.publish_with(
        Saved {
            document: DocumentEvent {
                path: "notes.txt".to_string(),
            },
            bytes,
        },
        &ui,
    )?;

    drop(ui);
    let passes = ui_task.await.context("UI task panicked")?;

    info!(
        buffer = editor.buffer.lock().as_str(),
        status = status.text.lock().as_str(),
        passes,
        published = bus.events_published(),
        "Demo finished"
    );

    print!("{}", guard.metrics().encode()?);
    Ok(())
}
