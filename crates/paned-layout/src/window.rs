#![forbid(unsafe_code)]

//! Windows: screen rectangles bound to buffers.

use std::collections::BTreeMap;

use paned_core::geometry::Rect;
use paned_core::surface::RegionId;

/// Identifier of a window, unique across all window sets of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub(crate) u64);

impl WindowId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Identifier of a buffer. Buffers live outside the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

/// Hands out window ids in increasing order.
#[derive(Debug, Clone)]
pub struct WindowIdAllocator {
    next: u64,
}

impl WindowIdAllocator {
    /// Allocate the next id and advance.
    pub fn allocate(&mut self) -> WindowId {
        let current = WindowId(self.next);
        self.next += 1;
        current
    }

    /// Peek at the next id without consuming it.
    #[must_use]
    pub const fn peek(&self) -> WindowId {
        WindowId(self.next)
    }
}

impl Default for WindowIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

/// Per-window view state such as the first visible row or a selected item.
///
/// A window shadows its buffer's saved state when the buffer is shown and the
/// runtime writes it back when the window loses selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowState(BTreeMap<String, i64>);

impl WindowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, or `0` when unset.
    pub fn get(&self, key: &str) -> i64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A window: one leaf of a window set's layout tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    id: WindowId,
    rect: Rect,
    region: RegionId,
    buffer: BufferId,
    state: WindowState,
}

impl Window {
    pub(crate) fn new(
        id: WindowId,
        rect: Rect,
        region: RegionId,
        buffer: BufferId,
        state: WindowState,
    ) -> Self {
        Self {
            id,
            rect,
            region,
            buffer,
            state,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Full rectangle including the mode line.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Rows available for buffer content (the last row is the mode line).
    pub fn content_rows(&self) -> u16 {
        self.rect.height.saturating_sub(1)
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WindowState {
        &mut self.state
    }

    /// Show another buffer, shadowing its saved window state.
    pub fn set_buffer(&mut self, buffer: BufferId, defaults: &WindowState) {
        self.buffer = buffer;
        self.state = defaults.clone();
    }

    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }
}
