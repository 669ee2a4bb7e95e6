#![forbid(unsafe_code)]

//! The I/O reactor: readiness polling over registered waitables.
//!
//! # Design
//!
//! The reactor is generic over the context type `C` its handlers receive,
//! normally the [`Engine`](crate::engine::Engine). Handlers are reference
//! counted so that [`Reactor::select`] can release its borrow of the context
//! before calling one: a handler is free to register or unregister waitables,
//! and it may enter a nested frame that calls `select` again.
//!
//! Polling is level-triggered `poll(2)`. Once a handler has run, the
//! readiness of every remaining candidate is re-checked with a zero timeout,
//! because a nested frame may already have drained it.
//!
//! # Async events
//!
//! [`AsyncPoster`] is the only part of the reactor that may cross threads. It
//! writes `name\n` into a self-pipe whose read end the reactor polls next to
//! the registered waitables; the named handler then runs on the reactor's
//! thread during `select`. The self-pipe is created on first use and is not
//! counted as a waitable.
//!
//! The write end is non-blocking. When the pipe is full the reactor is
//! certain to wake, so a post that would block is dropped with a warning
//! instead of stalling the poster (or deadlocking the reactor thread).
//! Names are limited to [`MAX_EVENT_NAME`] bytes so each post is a single
//! atomic write.
//!
//! # Failure Modes
//!
//! - `POLLNVAL` or `POLLERR`: the waitable is unregistered; its handler is
//!   not called.
//! - `POLLHUP` without `POLLIN`: the handler runs once more (to observe end
//!   of file) and the waitable is then unregistered.
//! - A handler returning `Err`: the failure is logged and the waitable is
//!   unregistered. Other waitables are unaffected.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, OFlag};
use nix::poll::{PollFd, PollFlags, PollTimeout};
use os_pipe::{PipeReader, PipeWriter};

use crate::error::ReactorError;

/// Longest async event name, in bytes.
pub const MAX_EVENT_NAME: usize = 255;

/// Handle of a registered waitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaitableId(u64);

impl WaitableId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Anything with a pollable file descriptor.
pub trait Waitable: AsFd + Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: AsFd + Any> Waitable for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Called when a waitable is readable.
pub type WaitableHandler<C> = Rc<dyn Fn(&mut C, WaitableId) -> io::Result<()>>;

/// Called when a named async event arrives.
pub type AsyncHandler<C> = Rc<dyn Fn(&mut C, &str) -> io::Result<()>>;

/// A context type that owns a reactor.
pub trait ReactorHost: Sized {
    fn reactor(&self) -> &Reactor<Self>;
    fn reactor_mut(&mut self) -> &mut Reactor<Self>;
}

struct Registration<C> {
    source: Box<dyn Waitable>,
    handler: WaitableHandler<C>,
}

struct Wakeup {
    reader: PipeReader,
    writer: Arc<PipeWriter>,
    partial: Vec<u8>,
}

/// Waitable registrations plus the async-event self-pipe.
pub struct Reactor<C> {
    next_id: u64,
    waitables: BTreeMap<WaitableId, Registration<C>>,
    async_handlers: BTreeMap<String, AsyncHandler<C>>,
    wakeup: Option<Wakeup>,
    active: bool,
}

impl<C> Default for Reactor<C> {
    fn default() -> Self {
        Self {
            next_id: 1,
            waitables: BTreeMap::new(),
            async_handlers: BTreeMap::new(),
            wakeup: None,
            active: false,
        }
    }
}

impl<C> fmt::Debug for Reactor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("waitables", &self.waitables.keys().collect::<Vec<_>>())
            .field("async_handlers", &self.async_handlers.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

impl<C> Reactor<C> {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register `source`; `handler` runs whenever it is readable.
    ///
    /// The first registration activates the reactor.
    pub fn register(
        &mut self,
        source: impl Waitable,
        handler: impl Fn(&mut C, WaitableId) -> io::Result<()> + 'static,
    ) -> WaitableId {
        let id = WaitableId(self.next_id);
        self.next_id += 1;
        self.waitables.insert(
            id,
            Registration {
                source: Box::new(source),
                handler: Rc::new(handler),
            },
        );
        if !self.active {
            self.active = true;
            tracing::info!("Starting waitable reactor");
        }
        tracing::debug!(waitable = id.get(), "registered waitable");
        id
    }

    /// Remove a registration and hand back its source.
    ///
    /// Removing the last waitable deactivates the reactor.
    pub fn unregister(&mut self, id: WaitableId) -> Result<Box<dyn Waitable>, ReactorError> {
        let registration = self
            .waitables
            .remove(&id)
            .ok_or(ReactorError::UnknownWaitable(id))?;
        tracing::debug!(waitable = id.get(), "unregistered waitable");
        if self.waitables.is_empty() && self.active {
            self.active = false;
            tracing::info!("Stopping waitable reactor");
        }
        Ok(registration.source)
    }

    /// Borrow a registered source as its concrete type.
    pub fn waitable_mut<T: Waitable>(&mut self, id: WaitableId) -> Option<&mut T> {
        // Deref the box first: `Box<dyn Waitable>` is itself a `Waitable`.
        let source: &mut dyn Waitable = &mut *self.waitables.get_mut(&id)?.source;
        source.as_any_mut().downcast_mut::<T>()
    }

    pub fn is_registered(&self, id: WaitableId) -> bool {
        self.waitables.contains_key(&id)
    }

    pub fn waitable_count(&self) -> usize {
        self.waitables.len()
    }

    /// Whether at least one waitable is registered.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a blocking `select` could ever return.
    pub fn can_wake(&self) -> bool {
        self.active || (self.wakeup.is_some() && !self.async_handlers.is_empty())
    }

    // -----------------------------------------------------------------------
    // Async events
    // -----------------------------------------------------------------------

    /// Run `handler` on the reactor thread whenever `name` is posted.
    ///
    /// Registering a name again replaces its handler.
    pub fn register_async(
        &mut self,
        name: &str,
        handler: impl Fn(&mut C, &str) -> io::Result<()> + 'static,
    ) -> Result<(), ReactorError> {
        validate_event_name(name)?;
        self.ensure_wakeup()?;
        if self
            .async_handlers
            .insert(name.to_string(), Rc::new(handler))
            .is_some()
        {
            tracing::warn!(event = name, "replacing async event handler");
        }
        Ok(())
    }

    /// Forget the handler for `name`. Returns whether one existed.
    pub fn unregister_async(&mut self, name: &str) -> bool {
        self.async_handlers.remove(name).is_some()
    }

    /// A thread-safe handle for posting async events.
    pub fn poster(&mut self) -> Result<AsyncPoster, ReactorError> {
        let wakeup = self.ensure_wakeup()?;
        Ok(AsyncPoster {
            writer: Arc::clone(&wakeup.writer),
        })
    }

    /// Post an event from the reactor's own thread.
    pub fn post_async_event(&mut self, name: &str) -> Result<(), ReactorError> {
        self.poster()?.post(name)
    }

    fn ensure_wakeup(&mut self) -> Result<&mut Wakeup, ReactorError> {
        let wakeup = match self.wakeup.take() {
            Some(wakeup) => wakeup,
            None => {
                let (reader, writer) = os_pipe::pipe()?;
                set_nonblocking(&writer)?;
                Wakeup {
                    reader,
                    writer: Arc::new(writer),
                    partial: Vec::new(),
                }
            }
        };
        Ok(self.wakeup.insert(wakeup))
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    /// Readiness of every waitable, plus the self-pipe as the last entry.
    fn poll_all(&self, timeout: PollTimeout) -> Result<Option<Vec<PollFlags>>, ReactorError> {
        let mut fds: Vec<PollFd<'_>> = self
            .waitables
            .values()
            .map(|registration| PollFd::new(registration.source.as_fd(), PollFlags::POLLIN))
            .collect();
        if let Some(wakeup) = &self.wakeup {
            fds.push(PollFd::new(wakeup.reader.as_fd(), PollFlags::POLLIN));
        }
        match nix::poll::poll(&mut fds, timeout) {
            Ok(_) => Ok(Some(
                fds.iter()
                    .map(|fd| fd.revents().unwrap_or(PollFlags::empty()))
                    .collect(),
            )),
            Err(Errno::EINTR) => Ok(None),
            Err(err) => Err(ReactorError::Io(io::Error::from(err))),
        }
    }

    /// Current readiness of one waitable, without blocking.
    fn recheck(&self, id: WaitableId) -> PollFlags {
        match self.waitables.get(&id) {
            Some(registration) => poll_now(registration.source.as_fd()),
            None => PollFlags::empty(),
        }
    }

    /// Complete event names waiting in the self-pipe.
    fn drain_wakeup(&mut self) -> io::Result<Vec<String>> {
        let Some(wakeup) = self.wakeup.as_mut() else {
            return Ok(Vec::new());
        };
        if !poll_now(wakeup.reader.as_fd()).contains(PollFlags::POLLIN) {
            return Ok(Vec::new());
        }
        let mut chunk = [0u8; 512];
        let read = wakeup.reader.read(&mut chunk)?;
        wakeup.partial.extend_from_slice(&chunk[..read]);
        let mut names = Vec::new();
        while let Some(end) = wakeup.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = wakeup.partial.drain(..=end).collect();
            names.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        Ok(names)
    }
}

impl<C: ReactorHost> Reactor<C> {
    /// Wait for readiness and run the handlers of ready waitables.
    ///
    /// `None` blocks until something is ready. Returns the number of
    /// handlers that ran; an interrupted wait returns `Ok(0)`.
    pub fn select(ctx: &mut C, timeout: Option<Duration>) -> Result<usize, ReactorError> {
        let reactor = ctx.reactor_mut();
        if timeout.is_none() && !reactor.can_wake() {
            return Err(ReactorError::WouldBlockForever);
        }
        let ids: Vec<WaitableId> = reactor.waitables.keys().copied().collect();
        let has_wakeup = reactor.wakeup.is_some();
        let Some(ready) = reactor.poll_all(poll_timeout(timeout))? else {
            return Ok(0);
        };

        let mut ran = 0;
        for (id, flags) in ids.iter().copied().zip(ready.iter().copied()) {
            if flags.is_empty() {
                continue;
            }
            let reactor = ctx.reactor_mut();
            let Some(registration) = reactor.waitables.get(&id) else {
                continue;
            };
            let handler = Rc::clone(&registration.handler);
            let flags = if ran > 0 { reactor.recheck(id) } else { flags };
            if flags.is_empty() {
                continue;
            }
            if flags.intersects(PollFlags::POLLNVAL | PollFlags::POLLERR) {
                tracing::warn!(waitable = id.get(), ?flags, "waitable failed; unregistering");
                let _ = reactor.unregister(id);
                continue;
            }

            ran += 1;
            if let Err(err) = handler(ctx, id) {
                tracing::warn!(waitable = id.get(), error = %err, "waitable handler failed; unregistering");
                let _ = ctx.reactor_mut().unregister(id);
                continue;
            }
            let hung_up = flags.contains(PollFlags::POLLHUP) && !flags.contains(PollFlags::POLLIN);
            if hung_up && ctx.reactor().is_registered(id) {
                tracing::debug!(waitable = id.get(), "waitable hung up");
                let _ = ctx.reactor_mut().unregister(id);
            }
        }

        let wakeup_ready = has_wakeup && ready.last().is_some_and(|flags| !flags.is_empty());
        if wakeup_ready {
            ran += Self::dispatch_async(ctx)?;
        }
        Ok(ran)
    }

    fn dispatch_async(ctx: &mut C) -> Result<usize, ReactorError> {
        let names = ctx.reactor_mut().drain_wakeup()?;
        let mut ran = 0;
        for name in names {
            let Some(handler) = ctx.reactor().async_handlers.get(&name).map(Rc::clone) else {
                tracing::debug!(event = %name, "async event without handler");
                continue;
            };
            ran += 1;
            if let Err(err) = handler(ctx, &name) {
                tracing::warn!(event = %name, error = %err, "async event handler failed; unregistering");
                ctx.reactor_mut().unregister_async(&name);
            }
        }
        Ok(ran)
    }
}

/// Cloneable, `Send` handle that posts named events to a reactor.
#[derive(Debug, Clone)]
pub struct AsyncPoster {
    writer: Arc<PipeWriter>,
}

impl AsyncPoster {
    /// Queue `name` for the reactor thread.
    ///
    /// Writes shorter than the pipe buffer are atomic, so posters on
    /// different threads never interleave. Never blocks: if the pipe is
    /// full the event is dropped.
    pub fn post(&self, name: &str) -> Result<(), ReactorError> {
        validate_event_name(name)?;
        let mut line = Vec::with_capacity(name.len() + 1);
        line.extend_from_slice(name.as_bytes());
        line.push(b'\n');
        match (&*self.writer).write_all(&line) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                tracing::warn!(event = name, "async event pipe is full; dropping event");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn validate_event_name(name: &str) -> Result<(), ReactorError> {
    if name.is_empty() || name.len() > MAX_EVENT_NAME || name.contains('\n') {
        return Err(ReactorError::InvalidEventName(name.to_string()));
    }
    Ok(())
}

fn set_nonblocking(fd: impl AsFd) -> io::Result<()> {
    let flags = nix::fcntl::fcntl(fd.as_fd(), FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    nix::fcntl::fcntl(fd.as_fd(), FcntlArg::F_SETFL(flags))?;
    Ok(())
}

/// Whole milliseconds for `poll(2)`, rounded up so a short wait never
/// becomes a busy loop. Saturates at `i32::MAX` ms (about 24.8 days).
fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(timeout) => {
            let millis = timeout.as_micros().div_ceil(1000);
            let millis = i32::try_from(millis).unwrap_or(i32::MAX);
            PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX)
        }
    }
}

fn poll_now(fd: BorrowedFd<'_>) -> PollFlags {
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    match nix::poll::poll(&mut fds, PollTimeout::ZERO) {
        Ok(_) => fds[0].revents().unwrap_or(PollFlags::empty()),
        Err(_) => PollFlags::empty(),
    }
}
