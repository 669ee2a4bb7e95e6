#![forbid(unsafe_code)]

//! The engine: frames, dispatch and the public command surface.
//!
//! The engine owns the window manager, the buffer registry, the keymaps and
//! the reactor. Its run loop is a stack of frames. Frame 0 is the top level;
//! every blocking minibuffer read pushes a modal frame and runs the same loop
//! nested inside the action that issued the read, until a signal finishes it.
//!
//! Dispatch walks a fixed chain of keymaps for the pending chord sequence:
//! the minibuffer keymap while a read is active, otherwise the current
//! buffer's own keymap and then its class keymap, and finally the global
//! keymap. The first keymap that does not answer `NoMatch` decides.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use paned_core::chord::{Chord, ChordParseError, ChordSequence};
use paned_core::event::InputEvent;
use paned_core::geometry::Rect;
use paned_core::keymap::{Keymap, Lookup};
use paned_core::surface::ScreenSurface;
use paned_layout::{BufferId, Direction, LayoutError, Window, WindowId, WindowManager, WindowState};

use crate::buffer::{Buffer, BufferList, BufferSpec, RenderContext};
use crate::builtin::{self, LogBuffer};
use crate::commands;
use crate::config::EngineConfig;
use crate::error::{EngineError, ReactorError};
use crate::input::LineInput;
use crate::logging::SessionLog;
use crate::minibuffer::{self, Completion, MinibufferState};
use crate::reactor::{AsyncPoster, Reactor, ReactorHost, Waitable, WaitableId};
use crate::render::MinibufferContentFn;
use crate::signal::{Action, ActionError, Signal};
use crate::variables::{TAB_STOP, Variables};

/// Handle for removing an update function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateId(u64);

type UpdateFn = Rc<dyn Fn(&mut Engine)>;
type ExitHandler = Box<dyn FnOnce(&mut Engine)>;

/// A named function run once when the engine starts.
struct InitHook {
    name: String,
    run: Box<dyn FnOnce(&mut Engine) -> Result<(), ActionError>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitStage {
    Init,
    PostInit,
}

impl InitStage {
    const fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PostInit => "post-init",
        }
    }
}

/// One level of the run loop.
#[derive(Debug, Default)]
pub(crate) struct Frame {
    pending: ChordSequence,
    pub(crate) minibuffer: Option<MinibufferState>,
    outcome: Option<Result<String, Signal>>,
}

impl Frame {
    fn modal(state: MinibufferState) -> Self {
        Self {
            minibuffer: Some(state),
            ..Self::default()
        }
    }

    fn is_modal(&self) -> bool {
        self.minibuffer.is_some()
    }
}

/// The windowing engine.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) surface: Box<dyn ScreenSurface>,
    pub(crate) windows: WindowManager,
    pub(crate) buffers: BufferList,
    pub(crate) session_log: SessionLog,
    pub(crate) frames: Vec<Frame>,
    pub(crate) echo: Option<String>,
    last_message: Option<String>,
    global_keymap: Keymap<Action>,
    minibuffer_keymap: Keymap<Action>,
    class_keymaps: HashMap<TypeId, Keymap<Action>>,
    abort: Chord,
    reactor: Reactor<Engine>,
    input: VecDeque<InputEvent>,
    minibuffer_history: Vec<String>,
    update_fns: Vec<(UpdateId, UpdateFn)>,
    next_update_id: u64,
    exit_handlers: Vec<ExitHandler>,
    init_hooks: Vec<InitHook>,
    post_init_hooks: Vec<InitHook>,
    hooks_run: BTreeSet<String>,
    pub(crate) variables: Variables,
    pub(crate) minibuffer_content: Option<MinibufferContentFn>,
    exiting: bool,
    running: bool,
}

impl ReactorHost for Engine {
    fn reactor(&self) -> &Reactor<Self> {
        &self.reactor
    }

    fn reactor_mut(&mut self) -> &mut Reactor<Self> {
        &mut self.reactor
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("window_sets", &self.windows.len())
            .field("buffers", &self.buffers)
            .field("frames", &self.frames.len())
            .field("reactor", &self.reactor)
            .field("running", &self.running)
            .finish()
    }
}

/// The part of the screen left for windows once the minibuffer rows are taken.
fn layout_area((rows, cols): (u16, u16), minibuffer_rows: u16) -> Rect {
    Rect::from_size(cols, rows.saturating_sub(minibuffer_rows))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Engine {
    /// Build an engine drawing to `surface`.
    ///
    /// The engine starts with one window showing the log buffer.
    pub fn new(config: EngineConfig, surface: impl ScreenSurface + 'static) -> Result<Self, EngineError> {
        let mut surface: Box<dyn ScreenSurface> = Box::new(surface);
        let session_log = SessionLog::new(config.log_capacity);
        let mut buffers = BufferList::new();
        let log_buffer = buffers.create::<LogBuffer>(&(), &session_log)?;
        let area = layout_area(surface.dimensions(), config.minibuffer_rows);
        let windows = WindowManager::new(
            area,
            log_buffer,
            buffers.window_defaults(log_buffer),
            config.layout,
            surface.as_mut(),
        );
        let abort = Chord::from_str(&config.abort_chord)?;

        let mut global_keymap = if config.install_default_keymap {
            commands::global_keymap()?
        } else {
            Keymap::new()
        };
        global_keymap.bind(&ChordSequence::from(abort), commands::cancel());
        let mut variables = Variables::new();
        variables.define(TAB_STOP, config.tab_stop.into());

        let mut engine = Self {
            surface,
            windows,
            buffers,
            session_log,
            frames: vec![Frame::default()],
            echo: None,
            last_message: None,
            global_keymap,
            minibuffer_keymap: commands::minibuffer_keymap()?,
            class_keymaps: HashMap::new(),
            abort,
            reactor: Reactor::new(),
            input: VecDeque::new(),
            minibuffer_history: Vec::new(),
            update_fns: Vec::new(),
            next_update_id: 1,
            exit_handlers: Vec::new(),
            init_hooks: Vec::new(),
            post_init_hooks: Vec::new(),
            hooks_run: BTreeSet::new(),
            variables,
            minibuffer_content: None,
            exiting: false,
            running: false,
            config,
        };
        builtin::register_classes(&mut engine)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> &dyn ScreenSurface {
        self.surface.as_ref()
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    /// Run the init hooks, then the top-level frame until exit, then the
    /// exit handlers.
    pub fn run(&mut self) -> Result<(), EngineError> {
        let span = tracing::info_span!("paned.engine.run");
        let _guard = span.enter();
        tracing::info!("engine started");
        self.running = true;
        self.run_init_hooks(InitStage::Init);
        self.run_init_hooks(InitStage::PostInit);
        let outcome = self.run_loop(0);
        self.running = false;
        self.run_exit_handlers();
        self.exiting = false;
        match &outcome {
            Ok(_) => tracing::info!("engine stopped"),
            Err(err) => tracing::error!(error = %err, "engine stopped"),
        }
        outcome.map(|_| ())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask every frame to finish. The run loop stops before the next input.
    pub fn exit(&mut self) {
        if !self.exiting {
            tracing::info!("exit requested");
        }
        self.exiting = true;
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Number of frames on the stack, the top level included.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    fn run_loop(&mut self, depth: usize) -> Result<Result<String, Signal>, EngineError> {
        loop {
            if self.exiting {
                return Ok(Err(Signal::Exit));
            }
            if let Some(outcome) = self.frames.get_mut(depth).and_then(|frame| frame.outcome.take()) {
                return Ok(outcome);
            }
            if self.frames.len() <= depth {
                // A panic unwound through this frame.
                return Ok(Err(Signal::Cancel));
            }
            self.step(depth)?;
        }
    }

    /// One iteration: render, update, then consume one input or wait for I/O.
    fn step(&mut self, depth: usize) -> Result<(), EngineError> {
        self.render()?;
        self.run_update_fns();
        if self.exiting || self.frames.get(depth).is_some_and(|frame| frame.outcome.is_some()) {
            return Ok(());
        }
        if let Some(event) = self.input.pop_front() {
            self.handle_input(event);
            return Ok(());
        }
        Reactor::select(self, self.config.select_timeout)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Queue an input event for the run loop.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push_back(event);
    }

    /// Queue a chord sequence written in chord syntax, e.g. `"C-x 2"`.
    pub fn feed_keys(&mut self, keys: &str) -> Result<(), ChordParseError> {
        let sequence = ChordSequence::from_str(keys)?;
        self.input
            .extend(sequence.as_slice().iter().copied().map(InputEvent::from));
        Ok(())
    }

    /// Queue typed text, one literal event per character.
    pub fn feed_text(&mut self, text: &str) {
        self.input.extend(text.chars().map(InputEvent::text));
    }

    /// Number of queued input events.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Handle every queued event without rendering or waiting for I/O.
    ///
    /// Returns how many events were handled.
    pub fn drain_input(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.input.pop_front() {
            self.handle_input(event);
            handled += 1;
        }
        handled
    }

    /// Handle one decoded input event immediately.
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Chord { chord, literal } => self.dispatch(chord, literal),
            InputEvent::Resize => self.resize(),
        }
    }

    /// Resolve `chord` against the pending sequence of the innermost frame.
    pub fn dispatch(&mut self, chord: Chord, literal: bool) {
        self.echo = None;
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        frame.pending.push(chord);
        let sequence = frame.pending.clone();
        let span = tracing::debug_span!("paned.engine.dispatch", keychord = %sequence);
        let _guard = span.enter();

        match self.resolve(&sequence) {
            Resolved::Action(action) => {
                self.clear_pending();
                self.run_action(&action, &sequence);
            }
            Resolved::Pending => {
                self.echo = Some(format!("{sequence}-"));
            }
            Resolved::NoMatch => {
                self.clear_pending();
                if sequence.len() > 1 && chord == self.abort {
                    self.deliver(Signal::Cancel);
                } else if literal && sequence.len() == 1 && self.insert_literal(chord) {
                    tracing::trace!("inserted literal input");
                } else {
                    self.echo = Some(format!("Unknown keychord: {sequence}"));
                }
            }
        }
    }

    fn resolve(&self, sequence: &ChordSequence) -> Resolved {
        let chords = sequence.as_slice();
        let mut chain: Vec<&Keymap<Action>> = Vec::with_capacity(4);
        if self.frames.last().is_some_and(Frame::is_modal) {
            chain.push(&self.minibuffer_keymap);
        } else if let Some(id) = self.current_buffer() {
            if let Some(own) = self.buffers.get(id).and_then(|buffer| buffer.keymap()) {
                chain.push(own);
            }
            if let Some(class) = self
                .buffers
                .type_of(id)
                .and_then(|type_id| self.class_keymaps.get(&type_id))
            {
                chain.push(class);
            }
        }
        chain.push(&self.global_keymap);

        for keymap in chain {
            match keymap.lookup(chords) {
                Lookup::Matched(action) => return Resolved::Action(action.clone()),
                Lookup::Pending => return Resolved::Pending,
                Lookup::NoMatch => {}
            }
        }
        Resolved::NoMatch
    }

    fn clear_pending(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pending.clear();
        }
    }

    fn insert_literal(&mut self, chord: Chord) -> bool {
        let Some(c) = chord.literal_text() else {
            return false;
        };
        let mut text = [0u8; 4];
        let text = c.encode_utf8(&mut text);
        if let Some(state) = self.minibuffer_mut() {
            state.input_mut().insert(text);
            return true;
        }
        match self.current_buffer_mut() {
            Some(buffer) if buffer.takes_input() => {
                buffer.insert_chars(text);
                true
            }
            _ => false,
        }
    }

    /// Run an action at the dispatch boundary.
    ///
    /// Failures and panics are reported and swallowed; signals are delivered
    /// to the innermost frame still on the stack.
    fn run_action(&mut self, action: &Action, sequence: &ChordSequence) {
        let depth = self.frames.len();
        let span = tracing::debug_span!("paned.engine.action", action = action.name());
        let _guard = span.enter();
        let outcome = catch_unwind(AssertUnwindSafe(|| action.call(self)));
        let signal = match outcome {
            Ok(Ok(signal) | Err(ActionError::Unwind(signal))) => signal,
            Ok(Err(ActionError::Failed(err))) => {
                self.report_failure(action, sequence, &err.to_string());
                Signal::Continue
            }
            Err(payload) => {
                self.frames.truncate(depth);
                self.report_failure(action, sequence, &panic_message(payload.as_ref()));
                Signal::Continue
            }
        };
        self.deliver(signal);
    }

    fn report_failure(&mut self, action: &Action, sequence: &ChordSequence, detail: &str) {
        tracing::error!(keychord = %sequence, action = action.name(), error = detail, "action failed");
        self.message(format!("Error in {}: {detail}", action.name()));
    }

    /// Apply a control signal to the innermost frame.
    fn deliver(&mut self, signal: Signal) {
        match signal {
            Signal::Continue => {}
            Signal::Exit => self.exit(),
            Signal::Result(value) => match self.frames.last_mut() {
                Some(frame) if frame.is_modal() => frame.outcome = Some(Ok(value)),
                _ => tracing::warn!(value = %value, "result signal outside a minibuffer read"),
            },
            Signal::Cancel => match self.frames.last_mut() {
                Some(frame) if frame.is_modal() => frame.outcome = Some(Err(Signal::Cancel)),
                _ => self.message("Cancelled."),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Update functions and exit handlers
    // -----------------------------------------------------------------------

    /// Run `f` once per loop iteration, before input is consumed.
    pub fn add_update_fn(&mut self, f: impl Fn(&mut Engine) + 'static) -> UpdateId {
        let id = UpdateId(self.next_update_id);
        self.next_update_id += 1;
        self.update_fns.push((id, Rc::new(f)));
        id
    }

    pub fn remove_update_fn(&mut self, id: UpdateId) -> bool {
        let before = self.update_fns.len();
        self.update_fns.retain(|(existing, _)| *existing != id);
        self.update_fns.len() != before
    }

    fn run_update_fns(&mut self) {
        let snapshot: Vec<(UpdateId, UpdateFn)> = self.update_fns.clone();
        for (id, f) in snapshot {
            if !self.update_fns.iter().any(|(existing, _)| *existing == id) {
                continue;
            }
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(self))) {
                let detail = panic_message(payload.as_ref());
                tracing::error!(error = %detail, "update function panicked; removing it");
                self.remove_update_fn(id);
                self.message(format!("Error in update function: {detail}"));
            }
        }
    }

    /// Run `f` after the top-level frame exits. Handlers run newest first.
    pub fn add_exit_handler(&mut self, f: impl FnOnce(&mut Engine) + 'static) {
        self.exit_handlers.push(Box::new(f));
    }

    fn run_exit_handlers(&mut self) {
        while let Some(handler) = self.exit_handlers.pop() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(self))) {
                tracing::error!(error = %panic_message(payload.as_ref()), "exit handler panicked");
            }
        }
    }

    /// Run `f` when the engine starts, before the first frame is drawn.
    ///
    /// Init functions run in registration order. A failure is reported as a
    /// message and does not stop the others.
    pub fn add_init_fn(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Engine) -> Result<(), ActionError> + 'static,
    ) {
        self.init_hooks.push(InitHook {
            name: name.to_string(),
            run: Box::new(f),
        });
    }

    /// Like [`Engine::add_init_fn`], but runs after every init function.
    pub fn add_post_init_fn(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Engine) -> Result<(), ActionError> + 'static,
    ) {
        self.post_init_hooks.push(InitHook {
            name: name.to_string(),
            run: Box::new(f),
        });
    }

    /// Whether an init or post-init function named `name` has completed.
    pub fn has_run(&self, name: &str) -> bool {
        self.hooks_run.contains(name)
    }

    fn run_init_hooks(&mut self, stage: InitStage) {
        let hooks = match stage {
            InitStage::Init => std::mem::take(&mut self.init_hooks),
            InitStage::PostInit => std::mem::take(&mut self.post_init_hooks),
        };
        for InitHook { name, run } in hooks {
            if self.exiting {
                break;
            }
            if self.has_run(&name) {
                self.message(format!(
                    "Warning: executing {} function {name} more than once.",
                    stage.label()
                ));
            }
            let failure = match catch_unwind(AssertUnwindSafe(|| run(self))) {
                Ok(Ok(())) => None,
                Ok(Err(ActionError::Unwind(Signal::Exit))) => {
                    self.exit();
                    None
                }
                Ok(Err(ActionError::Unwind(signal))) => {
                    tracing::debug!(hook = %name, ?signal, "init function unwound");
                    None
                }
                Ok(Err(ActionError::Failed(err))) => Some(err.to_string()),
                Err(payload) => {
                    self.frames.truncate(1);
                    Some(panic_message(payload.as_ref()))
                }
            };
            match failure {
                None => {
                    self.hooks_run.insert(name);
                }
                Some(detail) => {
                    tracing::error!(
                        hook = %name,
                        stage = stage.label(),
                        error = %detail,
                        "init function failed"
                    );
                    self.message(format!("{} function {name} failed: {detail}", stage.label()));
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Show a one-line message and append it to the session log.
    pub fn message(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{text}");
        self.session_log.push(text.clone());
        self.echo = Some(text.lines().next().unwrap_or_default().to_string());
        self.last_message = Some(text);
    }

    /// The most recent message.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// What the minibuffer line shows until the next keypress.
    pub fn echo_text(&self) -> Option<&str> {
        self.echo.as_deref()
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.session_log
    }

    // -----------------------------------------------------------------------
    // Keymaps
    // -----------------------------------------------------------------------

    pub fn global_keymap(&self) -> &Keymap<Action> {
        &self.global_keymap
    }

    /// Bind `keys` in the global keymap.
    pub fn bind_global(&mut self, keys: &str, action: Action) -> Result<(), ChordParseError> {
        self.global_keymap.bind_str(keys, action)?;
        Ok(())
    }

    /// Bind `keys` for every buffer of type `B`.
    pub fn bind_for_class<B: Buffer>(&mut self, keys: &str, action: Action) -> Result<(), ChordParseError> {
        self.class_keymaps
            .entry(TypeId::of::<B>())
            .or_default()
            .bind_str(keys, action)?;
        Ok(())
    }

    /// Install the class keymap for `B`: its own bindings over the bindings
    /// of `supers`, earlier supers shadowing later ones.
    pub fn register_buffer_class<'k, B: Buffer>(
        &mut self,
        own: &Keymap<Action>,
        supers: impl IntoIterator<Item = &'k Keymap<Action>>,
    ) {
        self.class_keymaps
            .insert(TypeId::of::<B>(), Keymap::composed(own, supers));
    }

    pub fn class_keymap<B: Buffer>(&self) -> Option<&Keymap<Action>> {
        self.class_keymaps.get(&TypeId::of::<B>())
    }

    // -----------------------------------------------------------------------
    // Windows
    // -----------------------------------------------------------------------

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn selected_window(&self) -> Option<&Window> {
        self.windows.selected_window()
    }

    /// View state of the selected window.
    pub fn selected_window_state_mut(&mut self) -> Option<&mut WindowState> {
        self.windows.selected_window_mut().map(Window::state_mut)
    }

    /// Line count of the current buffer and content rows of the selected window.
    pub fn selected_view_extent(&self) -> Option<(usize, u16)> {
        let window = self.windows.selected_window()?;
        let buffer = self.buffers.get(window.buffer())?;
        let names = self.buffers.names();
        let ctx = RenderContext {
            buffer_names: &names,
            session_log: &self.session_log,
            rows: window.content_rows(),
            selected: true,
        };
        Some((buffer.line_count(&ctx), window.content_rows()))
    }

    /// Copy the selected window's view state into its buffer's defaults.
    fn sync_selected_state(&mut self) {
        if let Some(window) = self.windows.selected_window() {
            let (buffer, state) = (window.buffer(), window.state().clone());
            self.buffers.set_window_defaults(buffer, state);
        }
    }

    /// Split the selected window; the new window shows the same buffer.
    pub fn split_below(&mut self) -> Result<WindowId, LayoutError> {
        let state = self.split_state();
        self.windows.split_below(&state, self.surface.as_mut())
    }

    pub fn split_right(&mut self) -> Result<WindowId, LayoutError> {
        let state = self.split_state();
        self.windows.split_right(&state, self.surface.as_mut())
    }

    fn split_state(&mut self) -> WindowState {
        self.sync_selected_state();
        self.windows
            .selected_window()
            .map(|window| window.state().clone())
            .unwrap_or_default()
    }

    pub fn delete_selected_window(&mut self) -> Result<WindowId, LayoutError> {
        self.sync_selected_state();
        self.windows.delete_selected_window(self.surface.as_mut())
    }

    pub fn delete_all_windows(&mut self) -> usize {
        self.sync_selected_state();
        self.windows.delete_all_windows(self.surface.as_mut())
    }

    pub fn select_next_window(&mut self) -> WindowId {
        self.sync_selected_state();
        self.windows.select_next_window()
    }

    pub fn select_previous_window(&mut self) -> WindowId {
        self.sync_selected_state();
        self.windows.select_previous_window()
    }

    pub fn select_direction(&mut self, direction: Direction) -> WindowId {
        self.sync_selected_state();
        self.windows.select_direction(direction)
    }

    /// Select a window in any set, activating that set.
    pub fn select_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        self.sync_selected_state();
        self.windows.select_window(window)
    }

    pub fn find_window(&self, predicate: impl FnMut(&Window) -> bool, current_set_only: bool) -> Option<WindowId> {
        self.windows.find_window(predicate, current_set_only)
    }

    /// Create (or find, by name) a window set showing the current buffer.
    pub fn new_window_set(&mut self, name: Option<&str>) -> usize {
        self.sync_selected_state();
        let Some(buffer) = self.current_buffer() else {
            return self.windows.active_index();
        };
        let state = self.buffers.window_defaults(buffer);
        self.windows
            .new_window_set(name, buffer, state, self.surface.as_mut())
    }

    pub fn delete_window_set(&mut self, index: usize) -> Result<(), LayoutError> {
        self.sync_selected_state();
        self.windows.delete_window_set(index, self.surface.as_mut())
    }

    pub fn delete_window_set_by_name(&mut self, name: &str) -> Result<(), LayoutError> {
        self.sync_selected_state();
        self.windows
            .delete_window_set_by_name(name, self.surface.as_mut())
    }

    pub fn delete_active_window_set(&mut self) -> Result<(), LayoutError> {
        self.sync_selected_state();
        self.windows.delete_active_window_set(self.surface.as_mut())
    }

    pub fn next_window_set(&mut self) -> usize {
        self.sync_selected_state();
        self.windows.next_window_set()
    }

    pub fn previous_window_set(&mut self) -> usize {
        self.sync_selected_state();
        self.windows.previous_window_set()
    }

    pub fn has_window_set(&self, name: &str) -> bool {
        self.windows.has_window_set(name)
    }

    /// Re-read the surface size and lay every window set out again.
    pub fn resize(&mut self) {
        let dimensions = self.surface.dimensions();
        let area = layout_area(dimensions, self.config.minibuffer_rows);
        tracing::debug!(rows = dimensions.0, cols = dimensions.1, "resize");
        self.windows.resize(area, self.surface.as_mut());
    }

    // -----------------------------------------------------------------------
    // Buffers
    // -----------------------------------------------------------------------

    pub fn buffers(&self) -> &BufferList {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferList {
        &mut self.buffers
    }

    /// The buffer shown in the selected window.
    pub fn current_buffer(&self) -> Option<BufferId> {
        self.windows.selected_window().map(Window::buffer)
    }

    pub fn current_buffer_mut(&mut self) -> Option<&mut dyn Buffer> {
        let id = self.current_buffer()?;
        self.buffers.get_mut(id)
    }

    /// The current buffer as `B`, if it is one.
    pub fn current_buffer_as_mut<B: Buffer>(&mut self) -> Option<&mut B> {
        let id = self.current_buffer()?;
        self.buffers.get_as_mut::<B>(id)
    }

    /// The line editor keys are routed to: the minibuffer's during a read,
    /// otherwise the current buffer's.
    pub fn focused_line_input_mut(&mut self) -> Option<&mut LineInput> {
        if self.frames.last().is_some_and(Frame::is_modal) {
            return self.minibuffer_mut().map(MinibufferState::input_mut);
        }
        self.current_buffer_mut()?.line_input_mut()
    }

    pub fn create_buffer<B: BufferSpec>(&mut self, args: &B::Args) -> Result<BufferId, EngineError> {
        Ok(self.buffers.create::<B>(args, &self.session_log)?)
    }

    pub fn get_or_create_buffer<B: BufferSpec>(&mut self, args: &B::Args) -> Result<BufferId, EngineError> {
        Ok(self.buffers.get_or_create::<B>(args, &self.session_log)?)
    }

    /// Show `buffer` in the selected window and move it to the front of the
    /// buffer list.
    pub fn select_buffer(&mut self, buffer: BufferId) -> bool {
        if !self.show_buffer(buffer) {
            return false;
        }
        self.buffers.move_to_front(buffer);
        true
    }

    /// Get or create `B` with `args` and select it.
    pub fn switch_to_buffer<B: BufferSpec>(&mut self, args: &B::Args) -> Result<BufferId, EngineError> {
        let id = self.get_or_create_buffer::<B>(args)?;
        self.select_buffer(id);
        Ok(id)
    }

    /// Show the buffer after the current one. The list order is kept.
    pub fn switch_to_next_buffer(&mut self) -> Option<BufferId> {
        let next = self.buffers.next_after(self.current_buffer()?)?;
        self.show_buffer(next);
        Some(next)
    }

    pub fn switch_to_previous_buffer(&mut self) -> Option<BufferId> {
        let previous = self.buffers.previous_before(self.current_buffer()?)?;
        self.show_buffer(previous);
        Some(previous)
    }

    fn show_buffer(&mut self, buffer: BufferId) -> bool {
        if !self.buffers.contains(buffer) {
            return false;
        }
        self.sync_selected_state();
        let defaults = self.buffers.window_defaults(buffer);
        match self.windows.selected_window_mut() {
            Some(window) => {
                window.set_buffer(buffer, &defaults);
                true
            }
            None => false,
        }
    }

    /// Remove a buffer. Windows showing it switch to the next buffer; killing
    /// the only buffer leaves a fresh log buffer behind.
    pub fn kill_buffer(&mut self, buffer: BufferId) -> Result<bool, EngineError> {
        if !self.buffers.contains(buffer) {
            return Ok(false);
        }
        if self.buffers.len() == 1 {
            self.create_buffer::<LogBuffer>(&())?;
        }
        self.sync_selected_state();
        let Some(replacement) = self.buffers.next_after(buffer) else {
            return Ok(false);
        };
        let defaults = self.buffers.window_defaults(replacement);
        let replaced = self.windows.replace_buffer(buffer, replacement, &defaults);
        self.buffers.remove(buffer);
        self.variables.forget_buffer(buffer);
        tracing::debug!(buffer = buffer.0, windows = replaced, "killed buffer");
        Ok(true)
    }

    pub fn kill_current_buffer(&mut self) -> Result<bool, EngineError> {
        match self.current_buffer() {
            Some(buffer) => self.kill_buffer(buffer),
            None => Ok(false),
        }
    }

    // -----------------------------------------------------------------------
    // Minibuffer reads
    // -----------------------------------------------------------------------

    /// The innermost active read.
    pub fn minibuffer(&self) -> Option<&MinibufferState> {
        self.frames.last()?.minibuffer.as_ref()
    }

    pub fn minibuffer_mut(&mut self) -> Option<&mut MinibufferState> {
        self.frames.last_mut()?.minibuffer.as_mut()
    }

    /// Run a modal frame for `state` and return the submitted value.
    ///
    /// Returns `Err(ActionError::Unwind(..))` when the read is cancelled or
    /// the engine exits, so callers propagate with `?`.
    pub fn activate_minibuffer(&mut self, state: MinibufferState) -> Result<String, ActionError> {
        let depth = self.frames.len();
        let span = tracing::debug_span!("paned.engine.frame", depth, prompt = state.prompt());
        let _guard = span.enter();
        let state = state.with_history(self.minibuffer_history.clone());
        self.frames.push(Frame::modal(state));
        let outcome = self.run_loop(depth);
        self.frames.truncate(depth);
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(signal)) => Err(ActionError::Unwind(signal)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn read_string(&mut self, prompt: &str, default: Option<&str>) -> Result<String, ActionError> {
        let state = MinibufferState::accept_any(prompt);
        self.activate_minibuffer(with_default(state, default))
    }

    pub fn read_integer(&mut self, prompt: &str, default: Option<i64>) -> Result<i64, ActionError> {
        let default = default.map(|value| value.to_string());
        let state = MinibufferState::new(prompt, minibuffer::integer_validator());
        let value = self.activate_minibuffer(with_default(state, default.as_deref()))?;
        Ok(value.parse::<i64>()?)
    }

    pub fn read_bool(&mut self, prompt: &str) -> Result<bool, ActionError> {
        let state = MinibufferState::new(prompt, minibuffer::bool_validator());
        Ok(self.activate_minibuffer(state)? == "true")
    }

    /// Read a path with filesystem completion.
    pub fn read_file(&mut self, prompt: &str, default: Option<&str>) -> Result<PathBuf, ActionError> {
        let state = MinibufferState::accept_any(prompt).with_completion(minibuffer::file_completer());
        Ok(PathBuf::from(self.activate_minibuffer(with_default(state, default))?))
    }

    /// Validate the active read's text and finish the read on success.
    pub(crate) fn minibuffer_submit(&mut self) -> Result<Signal, ActionError> {
        let Some(state) = self.minibuffer_mut() else {
            return Ok(Signal::Continue);
        };
        let text = state.text().to_string();
        match state.submit() {
            Ok(value) => {
                if !text.is_empty() && self.minibuffer_history.last() != Some(&text) {
                    self.minibuffer_history.push(text);
                }
                Ok(Signal::Result(value))
            }
            Err(reason) => {
                self.message(reason);
                Ok(Signal::Continue)
            }
        }
    }

    pub(crate) fn minibuffer_complete(&mut self) {
        let Some(state) = self.minibuffer_mut() else {
            return;
        };
        match state.complete() {
            Completion::Extended | Completion::Unsupported => {}
            Completion::NoMatch => self.echo = Some("No match.".to_string()),
            Completion::Ambiguous(candidates) => self.echo = Some(candidates.join(" ")),
        }
    }

    // -----------------------------------------------------------------------
    // Reactor
    // -----------------------------------------------------------------------

    pub fn reactor(&self) -> &Reactor<Engine> {
        &self.reactor
    }

    pub fn reactor_mut(&mut self) -> &mut Reactor<Engine> {
        &mut self.reactor
    }

    /// Watch `source`; `handler` runs on the loop thread when it is readable.
    pub fn register_waitable(
        &mut self,
        source: impl Waitable,
        handler: impl Fn(&mut Engine, WaitableId) -> io::Result<()> + 'static,
    ) -> WaitableId {
        self.reactor.register(source, handler)
    }

    pub fn unregister_waitable(&mut self, id: WaitableId) -> Result<Box<dyn Waitable>, ReactorError> {
        self.reactor.unregister(id)
    }

    /// Run `handler` on the loop thread whenever `name` is posted.
    pub fn register_async(
        &mut self,
        name: &str,
        handler: impl Fn(&mut Engine, &str) -> io::Result<()> + 'static,
    ) -> Result<(), ReactorError> {
        self.reactor.register_async(name, handler)
    }

    /// A `Send` handle other threads use to post async events.
    pub fn async_poster(&mut self) -> Result<AsyncPoster, ReactorError> {
        self.reactor.poster()
    }
}

enum Resolved {
    Action(Action),
    Pending,
    NoMatch,
}

fn with_default(state: MinibufferState, default: Option<&str>) -> MinibufferState {
    match default {
        Some(text) => state.with_default(text),
        None => state,
    }
}

#[cfg(test)]
mod tests {
    use paned_core::surface::HeadlessSurface;

    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), HeadlessSurface::new(25, 80)).unwrap()
    }

    #[test]
    fn starts_with_the_log_buffer_over_the_screen_minus_minibuffer() {
        let engine = engine();
        let window = engine.selected_window().unwrap();
        assert_eq!(window.rect(), Rect::from_size(80, 24));
        assert_eq!(engine.buffers().names(), vec!["Log"]);
        assert_eq!(engine.frame_depth(), 1);
    }

    #[test]
    fn pending_prefix_is_echoed_and_not_logged() {
        let mut engine = engine();
        engine.dispatch(Chord::from_str("C-x").unwrap(), false);
        assert_eq!(engine.echo_text(), Some("C-x-"));
        engine.dispatch(Chord::from_str("C-q").unwrap(), false);
        assert_eq!(engine.echo_text(), Some("Unknown keychord: C-x C-q"));
        assert!(engine.session_log().is_empty());
    }

    #[test]
    fn abort_after_a_prefix_cancels() {
        let mut engine = engine();
        engine.dispatch(Chord::from_str("C-x").unwrap(), false);
        engine.dispatch(Chord::from_str("C-g").unwrap(), false);
        assert_eq!(engine.last_message(), Some("Cancelled."));
    }

    #[test]
    fn result_outside_a_read_is_ignored() {
        let mut engine = engine();
        engine.deliver(Signal::Result("stray".into()));
        assert_eq!(engine.frame_depth(), 1);
        assert!(!engine.is_exiting());
    }

    #[test]
    fn exit_handlers_run_newest_first() {
        let mut engine = engine();
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = Rc::clone(&order);
            engine.add_exit_handler(move |_| order.borrow_mut().push(tag));
        }
        engine.exit();
        engine.run().unwrap();
        assert_eq!(*order.borrow(), vec!["second", "first"]);
        assert!(!engine.is_running());
    }

    #[test]
    fn update_functions_can_be_removed() {
        let mut engine = engine();
        let calls = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = engine.add_update_fn(move |_| counter.set(counter.get() + 1));
        engine.run_update_fns();
        assert!(engine.remove_update_fn(id));
        engine.run_update_fns();
        assert_eq!(calls.get(), 1);
        assert!(!engine.remove_update_fn(id));
    }

    fn quit_after_init(engine: &mut Engine) {
        engine.add_post_init_fn("quit", |_| Err(Signal::Exit.into()));
    }

    #[test]
    fn init_functions_run_before_post_init_functions() {
        let mut engine = engine();
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        for (tag, post) in [("a", false), ("b", true), ("c", false)] {
            let order = Rc::clone(&order);
            let f = move |_: &mut Engine| {
                order.borrow_mut().push(tag);
                Ok(())
            };
            if post {
                engine.add_post_init_fn(tag, f);
            } else {
                engine.add_init_fn(tag, f);
            }
        }
        quit_after_init(&mut engine);
        assert!(!engine.has_run("a"));
        engine.run().unwrap();
        assert_eq!(*order.borrow(), vec!["a", "c", "b"]);
        assert!(engine.has_run("a") && engine.has_run("b"));
        assert!(!engine.is_running());
    }

    #[test]
    fn failing_init_functions_are_reported_and_the_rest_still_run() {
        let mut engine = engine();
        engine.add_init_fn("broken", |_| Err(io::Error::other("no config").into()));
        engine.add_init_fn("panics", |_| panic!("bad state"));
        engine.add_init_fn("fine", |engine| {
            engine.message("ready");
            Ok(())
        });
        quit_after_init(&mut engine);
        engine.run().unwrap();
        assert!(!engine.has_run("broken"));
        assert!(!engine.has_run("panics"));
        assert!(engine.has_run("fine"));
        assert_eq!(engine.last_message(), Some("ready"));
    }

    #[test]
    fn init_function_failure_becomes_the_message() {
        let mut engine = engine();
        engine.add_init_fn("broken", |_| Err(io::Error::other("no config").into()));
        quit_after_init(&mut engine);
        engine.run().unwrap();
        assert_eq!(engine.last_message(), Some("init function broken failed: no config"));
    }

    #[test]
    fn running_an_init_function_twice_warns() {
        let mut engine = engine();
        engine.add_init_fn("setup", |_| Ok(()));
        engine.add_init_fn("setup", |_| Ok(()));
        quit_after_init(&mut engine);
        engine.run().unwrap();
        assert_eq!(
            engine.last_message(),
            Some("Warning: executing init function setup more than once.")
        );
    }

    #[test]
    fn bad_abort_chord_is_a_config_error() {
        let config = EngineConfig::default().with_abort_chord("X-q");
        let err = Engine::new(config, HeadlessSurface::new(25, 80)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidChord(_)));
    }
}
