#![forbid(unsafe_code)]

//! Window layout for paned.
//!
//! A [`WindowSet`] tiles its area with a binary split tree whose leaves are
//! [`Window`]s. A [`WindowManager`] keeps an ordered list of sets, exactly one
//! of which is active.

pub mod error;
pub mod manager;
pub mod window;
pub mod window_set;

pub use error::LayoutError;
pub use manager::WindowManager;
pub use window::{BufferId, Window, WindowId, WindowIdAllocator, WindowState};
pub use window_set::{
    Direction, Divider, LayoutConfig, NodeId, NodeKind, NodeRecord, Split, SplitAxis, SplitRatio,
    WindowSet,
};
