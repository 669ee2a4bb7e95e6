#![forbid(unsafe_code)]

//! Reactor and engine failures.

use std::fmt;
use std::io;

use paned_core::chord::ChordParseError;

use crate::reactor::WaitableId;

/// Failures of the I/O reactor.
#[derive(Debug)]
pub enum ReactorError {
    /// An operating-system call failed.
    Io(io::Error),
    /// Async event names are newline-delimited on the wire.
    InvalidEventName(String),
    /// No waitable is registered under this id.
    UnknownWaitable(WaitableId),
    /// `select` was asked to block with nothing that could wake it.
    WouldBlockForever,
}

impl fmt::Display for ReactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "reactor I/O error: {err}"),
            Self::InvalidEventName(name) => write!(f, "invalid async event name: {name:?}"),
            Self::UnknownWaitable(id) => write!(f, "no waitable registered as {}", id.get()),
            Self::WouldBlockForever => {
                write!(f, "select would block forever: no waitable is registered")
            }
        }
    }
}

impl std::error::Error for ReactorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ReactorError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Failures of the runtime variable store.
#[derive(Debug)]
pub enum VariableError {
    /// `set` on a name nobody defined.
    Undefined(String),
    /// The value could not be converted to or from its stored form.
    Conversion {
        name: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for VariableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined(name) => write!(f, "variable {name} is not defined"),
            Self::Conversion { name, source } => write!(f, "variable {name}: {source}"),
        }
    }
}

impl std::error::Error for VariableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Undefined(_) => None,
            Self::Conversion { source, .. } => Some(source),
        }
    }
}

/// Failures that stop the engine's run loop.
#[derive(Debug)]
pub enum EngineError {
    /// Rendering or terminal I/O failed.
    Io(io::Error),
    /// The reactor failed.
    Reactor(ReactorError),
    /// The loop ran out of queued input and has no waitable to block on.
    NoInputSource,
    /// The tracing subscriber could not be installed.
    Logging(String),
    /// Buffer creation arguments could not be serialized into an identity key.
    InvalidBufferArgs(serde_json::Error),
    /// A configured chord sequence does not parse.
    InvalidChord(ChordParseError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Reactor(err) => write!(f, "{err}"),
            Self::NoInputSource => write!(f, "no input source: nothing queued and nothing to wait on"),
            Self::Logging(detail) => write!(f, "logging setup failed: {detail}"),
            Self::InvalidBufferArgs(err) => write!(f, "invalid buffer arguments: {err}"),
            Self::InvalidChord(err) => write!(f, "invalid chord: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Reactor(err) => Some(err),
            Self::InvalidBufferArgs(err) => Some(err),
            Self::InvalidChord(err) => Some(err),
            Self::NoInputSource | Self::Logging(_) => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ReactorError> for EngineError {
    fn from(err: ReactorError) -> Self {
        match err {
            ReactorError::WouldBlockForever => Self::NoInputSource,
            other => Self::Reactor(other),
        }
    }
}

impl From<ChordParseError> for EngineError {
    fn from(err: ChordParseError) -> Self {
        Self::InvalidChord(err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidBufferArgs(err)
    }
}
