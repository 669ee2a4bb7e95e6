#![forbid(unsafe_code)]

//! Control signals and the action boundary.
//!
//! Actions return [`ActionResult`]. A plain `Ok(Signal::Continue)` is the
//! common case. The other signals are control transfers, not errors:
//!
//! - [`Signal::Result`] finishes the innermost modal frame with a value.
//! - [`Signal::Cancel`] finishes modal frames one at a time until it reaches
//!   the top-level frame, where it is reported as "Cancelled.".
//! - [`Signal::Exit`] finishes every frame.
//!
//! Blocking reads return `Result<T, ActionError>`, so an action written with
//! `?` re-raises whatever signal ended the read it issued. Any other error
//! converts into [`ActionError::Failed`] and is reported at the dispatch
//! boundary.

use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crate::engine::Engine;

/// A non-local control transfer raised by action code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Keep running the current frame.
    Continue,
    /// Abort the current interaction.
    Cancel,
    /// Finish the innermost modal read with a value.
    Result(String),
    /// Terminate the engine.
    Exit,
}

impl Signal {
    /// `true` for every signal except [`Signal::Continue`].
    pub const fn unwinds(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Why an action did not complete normally.
///
/// Not an [`Error`] itself, so that `?` can lift any error into it.
pub enum ActionError {
    /// A control signal travelling up the frame stack.
    Unwind(Signal),
    /// The action failed.
    Failed(Box<dyn Error + 'static>),
}

impl ActionError {
    /// A failure carrying only a message.
    pub fn msg(text: impl Into<String>) -> Self {
        Self::Failed(Box::new(Failure(text.into())))
    }

    /// The signal this error carries, if any.
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Self::Unwind(signal) => Some(signal),
            Self::Failed(_) => None,
        }
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unwind(signal) => f.debug_tuple("Unwind").field(signal).finish(),
            Self::Failed(err) => f.debug_tuple("Failed").field(&err.to_string()).finish(),
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unwind(signal) => write!(f, "unwinding with {signal:?}"),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> From<E> for ActionError {
    fn from(err: E) -> Self {
        Self::Failed(Box::new(err))
    }
}

impl From<Signal> for ActionError {
    fn from(signal: Signal) -> Self {
        Self::Unwind(signal)
    }
}

#[derive(Debug)]
struct Failure(String);

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Failure {}

/// What an action returns.
pub type ActionResult = Result<Signal, ActionError>;

type ActionFn = dyn Fn(&mut Engine) -> ActionResult;

/// A named, shareable command bound in keymaps.
#[derive(Clone)]
pub struct Action {
    name: Rc<str>,
    run: Rc<ActionFn>,
}

impl Action {
    pub fn new(name: &str, run: impl Fn(&mut Engine) -> ActionResult + 'static) -> Self {
        Self {
            name: Rc::from(name),
            run: Rc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the action against the engine.
    pub fn call(&self, engine: &mut Engine) -> ActionResult {
        (self.run)(engine)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

impl PartialEq for Action {
    /// Two handles are equal when they share the same closure.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.run, &other.run)
    }
}
