#![forbid(unsafe_code)]

//! The session log and tracing setup.
//!
//! The session log is the bounded list of messages the log buffer shows.
//! Messages reach it two ways: [`Engine::message`](crate::engine::Engine::message)
//! appends directly, and [`SessionLogLayer`] mirrors every `WARN` and `ERROR`
//! tracing event, so failures logged anywhere in the stack stay visible.

use std::collections::VecDeque;
use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::EngineError;

/// Default number of retained session-log entries.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

// ---------------------------------------------------------------------------
// Session log
// ---------------------------------------------------------------------------

/// A bounded, shared list of log lines. The oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct SessionLog {
    entries: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl SessionLog {
    /// A log keeping at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one entry, evicting the oldest past the cap.
    pub fn push(&self, entry: impl Into<String>) {
        let mut entries = self.lock();
        entries.push_back(entry.into());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Copy of the current entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tracing layer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EventText {
    message: Option<String>,
    fields: Vec<String>,
}

impl Visit for EventText {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

/// Mirrors `WARN` and `ERROR` events into a [`SessionLog`].
#[derive(Debug, Clone)]
pub struct SessionLogLayer {
    log: SessionLog,
}

impl SessionLogLayer {
    pub fn new(log: SessionLog) -> Self {
        Self { log }
    }
}

impl<S: Subscriber> Layer<S> for SessionLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return;
        }
        let mut text = EventText::default();
        event.record(&mut text);
        let mut line = format!("{level}: {}", text.message.unwrap_or_default());
        for field in &text.fields {
            line.push(' ');
            line.push_str(field);
        }
        self.log.push(line);
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Where tracing output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Optional file receiving formatted events. The terminal itself is
    /// owned by the UI, so there is no stderr output.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// Install the global tracing subscriber.
///
/// Fails instead of panicking when a global subscriber already exists.
pub fn init_tracing(config: &LoggingConfig, log: SessionLog) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|err| EngineError::Logging(err.to_string()))?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(SessionLogLayer::new(log))
        .try_init()
        .map_err(|err| EngineError::Logging(err.to_string()))
}
