//! Tracing setup and the in-process diagnostics buffer.
//!
//! Warnings and errors are kept in a bounded ring so administrators can read
//! the recent ones from chat with the `diagnostics` command.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// A captured warning or error
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl DiagnosticEntry {
    pub fn format(&self) -> String {
        format!(
            "{} {} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.target,
            self.message
        )
    }
}

/// Ring buffer of the most recent WARN/ERROR entries
pub struct DiagnosticBuffer {
    recent: parking_lot::RwLock<VecDeque<DiagnosticEntry>>,
    capacity: usize,
}

impl DiagnosticBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: parking_lot::RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, entry: DiagnosticEntry) {
        let mut recent = self.recent.write();
        if recent.len() >= self.capacity {
            recent.pop_front();
        }
        recent.push_back(entry);
    }

    /// Up to `count` newest entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<DiagnosticEntry> {
        let recent = self.recent.read();
        let start = recent.len().saturating_sub(count);
        recent.iter().skip(start).cloned().collect()
    }
}

pub type SharedDiagnostics = Arc<DiagnosticBuffer>;

pub fn create_diagnostics(capacity: usize) -> SharedDiagnostics {
    Arc::new(DiagnosticBuffer::new(capacity))
}

/// Tracing layer that copies warnings and errors into the buffer
pub struct DiagnosticLayer {
    buffer: SharedDiagnostics,
}

impl DiagnosticLayer {
    pub fn new(buffer: SharedDiagnostics) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for DiagnosticLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        // More verbose levels compare greater
        if level > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(DiagnosticEntry {
            timestamp: chrono::Utc::now(),
            level,
            target: event.metadata().target().to_string(),
            message: visitor.message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else if self.message.is_empty() {
            self.message = format!("{}={}", field.name(), value);
        }
    }
}

/// Install the global subscriber: fmt output filtered by `RUST_LOG`
/// (default `info`) plus the diagnostics capture
pub fn init_tracing(buffer: SharedDiagnostics) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(DiagnosticLayer::new(buffer))
        .init();
}
