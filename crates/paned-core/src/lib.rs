#![forbid(unsafe_code)]

//! Core: geometry, key chords, keymaps, input events, and the screen-surface
//! contract shared by the layout engine and the runtime.

pub mod chord;
pub mod event;
pub mod geometry;
pub mod keymap;
pub mod surface;
pub mod text;

pub use chord::{Chord, ChordModifiers, ChordParseError, ChordSequence, Key, NamedKey};
pub use event::InputEvent;
pub use geometry::Rect;
pub use keymap::{Binding, Keymap, Lookup};
pub use surface::{Attributes, Color, HeadlessSurface, RegionId, ScreenSurface, Style, Symbol};
pub use text::{Line, Span};
