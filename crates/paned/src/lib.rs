#![forbid(unsafe_code)]

//! paned public facade crate.
//!
//! Re-exports the types an application needs to build an [`Engine`], define
//! buffers and bind commands, plus a [`prelude`] for glob import.

// --- Core re-exports -------------------------------------------------------

pub use paned_core::{
    Chord, ChordModifiers, ChordParseError, ChordSequence, HeadlessSurface, InputEvent, Key,
    Keymap, Line, NamedKey, Rect, ScreenSurface, Span, Style,
};

// --- Layout re-exports -----------------------------------------------------

pub use paned_layout::{
    BufferId, Direction, LayoutConfig, LayoutError, SplitRatio, Window, WindowId, WindowManager,
    WindowSet, WindowState,
};

// --- Runtime re-exports ----------------------------------------------------

pub use paned_runtime::{
    Action, ActionError, ActionResult, AsyncPoster, Buffer, BufferList, BufferListBuffer,
    BufferSpec, ConsoleBuffer, Engine, EngineConfig, EngineError, LogBuffer, LoggingConfig,
    MinibufferContent, MinibufferState, RenderContext, SessionLog, Signal, TerminalOptions,
    TerminalSurface, VariableError, Variables, init_tracing,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Action, ActionError, ActionResult, Buffer, BufferSpec, Engine, EngineConfig, EngineError,
        Line, RenderContext, Signal, VariableError, WindowState,
    };

    pub use crate::{core, layout, runtime};
}

pub use paned_core as core;
pub use paned_layout as layout;
pub use paned_runtime as runtime;
