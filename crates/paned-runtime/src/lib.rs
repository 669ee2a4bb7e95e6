#![forbid(unsafe_code)]

//! The paned runtime: the frame-stack run loop, key dispatch, minibuffer
//! reads, the buffer registry, and the poll-based I/O reactor.
//!
//! An [`Engine`] is built over any [`ScreenSurface`](paned_core::ScreenSurface).
//! Hosts feed it input (from the terminal via
//! [`Engine::attach_terminal_input`], or directly with
//! [`Engine::push_input`]) and call [`Engine::run`].

pub mod buffer;
pub mod builtin;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod minibuffer;
pub mod reactor;
pub mod render;
pub mod signal;
pub mod terminal;
pub mod variables;

pub use buffer::{Buffer, BufferKey, BufferList, BufferSpec, Lines, RenderContext};
pub use builtin::{BufferListBuffer, ConsoleBuffer, ConsoleHandler, FIRST_ROW, LogBuffer, SELECTED_ITEM};
pub use config::EngineConfig;
pub use engine::{Engine, UpdateId};
pub use error::{EngineError, ReactorError, VariableError};
pub use input::LineInput;
pub use logging::{LoggingConfig, SessionLog, SessionLogLayer, init_tracing};
pub use minibuffer::{Completion, MinibufferState};
pub use reactor::{AsyncPoster, MAX_EVENT_NAME, Reactor, ReactorHost, Waitable, WaitableId};
pub use render::{MinibufferContent, MinibufferContentFn};
pub use signal::{Action, ActionError, ActionResult, Signal};
pub use terminal::{TerminalOptions, TerminalSurface};
pub use variables::{TAB_STOP, Variables};
