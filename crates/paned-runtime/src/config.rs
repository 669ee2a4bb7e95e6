#![forbid(unsafe_code)]

//! Engine configuration.

use std::time::Duration;

use paned_layout::LayoutConfig;

use crate::logging::DEFAULT_LOG_CAPACITY;

/// Settings fixed when an [`Engine`](crate::engine::Engine) is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minimum window size and default split ratio.
    pub layout: LayoutConfig,
    /// Entries kept in the session log.
    pub log_capacity: usize,
    /// How long one reactor `select` may wait. `None` blocks.
    pub select_timeout: Option<Duration>,
    /// Tab width used when rendering buffer lines.
    pub tab_stop: u16,
    /// Screen rows reserved at the bottom for the minibuffer.
    pub minibuffer_rows: u16,
    /// Chord sequence bound to cancel.
    pub abort_chord: String,
    /// Whether the engine installs its built-in global bindings.
    pub install_default_keymap: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            select_timeout: None,
            tab_stop: 4,
            minibuffer_rows: 1,
            abort_chord: "C-g".to_string(),
            install_default_keymap: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_select_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.select_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_tab_stop(mut self, tab_stop: u16) -> Self {
        self.tab_stop = tab_stop.max(1);
        self
    }

    #[must_use]
    pub fn with_minibuffer_rows(mut self, rows: u16) -> Self {
        self.minibuffer_rows = rows.max(1);
        self
    }

    #[must_use]
    pub fn with_abort_chord(mut self, chord: impl Into<String>) -> Self {
        self.abort_chord = chord.into();
        self
    }

    #[must_use]
    pub fn with_default_keymap(mut self, install: bool) -> Self {
        self.install_default_keymap = install;
        self
    }
}
