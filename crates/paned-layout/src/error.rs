#![forbid(unsafe_code)]

//! Layout failures.
//!
//! Every variant describes a refused operation; the tree is left exactly as
//! it was. The `Display` text is what the user sees in the echo area.

use std::fmt;

use crate::window::WindowId;

/// Structured reasons for a refused layout operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A split would produce a window below the minimum size.
    TooSmall { rows: u16, cols: u16 },
    /// The only remaining window of a set cannot be deleted.
    CannotDeleteLastWindow,
    /// The first window set is never deleted.
    CannotDeletePrimordialSet,
    /// No window set with this index.
    UnknownWindowSetIndex(usize),
    /// No window set with this name.
    UnknownWindowSet(String),
    /// No window with this id.
    UnknownWindow(WindowId),
    /// A structural invariant does not hold.
    InvalidTree(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { .. } => write!(f, "Can not split. Dimensions too small."),
            Self::CannotDeleteLastWindow => write!(f, "Can not delete last window."),
            Self::CannotDeletePrimordialSet => write!(f, "Can not delete window set 1."),
            Self::UnknownWindowSetIndex(index) => write!(f, "No window set {}.", index + 1),
            Self::UnknownWindowSet(name) => write!(f, "No window set named '{name}'."),
            Self::UnknownWindow(id) => write!(f, "No window with id {}.", id.get()),
            Self::InvalidTree(detail) => write!(f, "invalid window tree: {detail}"),
        }
    }
}

impl std::error::Error for LayoutError {}
