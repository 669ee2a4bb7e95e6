#![forbid(unsafe_code)]

//! Built-in buffers and the capability keymaps they compose.
//!
//! Capabilities are plain keymaps: list navigation, scrolling and line
//! editing. A buffer class gets a capability by listing its keymap as a
//! super when the class is registered.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use paned_core::chord::ChordParseError;
use paned_core::keymap::Keymap;
use paned_core::surface::Style;
use paned_core::text::{Line, Span};
use paned_layout::WindowState;

use crate::buffer::{Buffer, BufferSpec, Lines, RenderContext};
use crate::engine::Engine;
use crate::input::LineInput;
use crate::logging::SessionLog;
use crate::signal::{Action, ActionResult, Signal};

/// View-state key: first buffer line shown in the window.
pub const FIRST_ROW: &str = "first-row";

/// View-state key: highlighted item of a list view.
pub const SELECTED_ITEM: &str = "selected-item";

fn item_line(text: &str, selected: bool) -> Line {
    let first = text.lines().next().unwrap_or_default();
    if selected {
        Line::styled(first, Style::SELECTION)
    } else {
        Line::raw(first)
    }
}

// ---------------------------------------------------------------------------
// Log buffer
// ---------------------------------------------------------------------------

/// Shows the session log, one entry per line.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    log: SessionLog,
}

impl Buffer for LogBuffer {
    fn name(&self) -> &str {
        "Log"
    }

    fn line_count(&self, _ctx: &RenderContext<'_>) -> usize {
        self.log.len()
    }

    fn lines<'a>(&'a self, first: usize, view: &'a WindowState, _ctx: &'a RenderContext<'a>) -> Lines<'a> {
        let selected = view.get(SELECTED_ITEM);
        Box::new(
            self.log
                .entries()
                .into_iter()
                .enumerate()
                .skip(first)
                .map(move |(index, entry)| item_line(&entry, index as i64 == selected)),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BufferSpec for LogBuffer {
    type Args = ();

    fn create(_args: &(), session_log: &SessionLog) -> Self {
        Self {
            log: session_log.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Buffer list
// ---------------------------------------------------------------------------

/// Lists every buffer; choosing an item selects that buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferListBuffer;

impl Buffer for BufferListBuffer {
    fn name(&self) -> &str {
        "Buffers"
    }

    fn line_count(&self, ctx: &RenderContext<'_>) -> usize {
        ctx.buffer_names.len()
    }

    fn lines<'a>(&'a self, first: usize, view: &'a WindowState, ctx: &'a RenderContext<'a>) -> Lines<'a> {
        let selected = view.get(SELECTED_ITEM);
        Box::new(
            ctx.buffer_names
                .iter()
                .enumerate()
                .skip(first)
                .map(move |(index, name)| item_line(name, index as i64 == selected)),
        )
    }

    fn on_item_selected(&self, index: usize) -> Option<Action> {
        Some(Action::new("select-listed-buffer", move |engine: &mut Engine| {
            if let Some(id) = engine.buffers().id_at(index) {
                engine.select_buffer(id);
            }
            Ok(Signal::Continue)
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BufferSpec for BufferListBuffer {
    type Args = ();

    fn create(_args: &(), _session_log: &SessionLog) -> Self {
        Self
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Runs when a console line is sent.
pub type ConsoleHandler = Rc<dyn Fn(&mut Engine, &str) -> ActionResult>;

/// An interactive line-input buffer with a scrolling transcript.
///
/// Typed text goes into the input line; `<enter>` appends the line to the
/// transcript and hands it to the console's handler, if any.
#[derive(Clone)]
pub struct ConsoleBuffer {
    name: String,
    prompt: String,
    input: LineInput,
    transcript: Vec<String>,
    handler: Option<ConsoleHandler>,
}

impl fmt::Debug for ConsoleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleBuffer")
            .field("name", &self.name)
            .field("input", &self.input.text())
            .field("transcript", &self.transcript.len())
            .finish()
    }
}

impl ConsoleBuffer {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn input(&self) -> &LineInput {
        &self.input
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Append output below the transcript.
    pub fn append(&mut self, text: &str) {
        self.transcript.extend(text.lines().map(str::to_string));
    }

    pub fn set_handler(&mut self, handler: ConsoleHandler) {
        self.handler = Some(handler);
    }

    /// Move the input line into the transcript and return its text.
    pub fn send(&mut self) -> String {
        let text = self.input.submit();
        self.transcript.push(format!("{}{text}", self.prompt));
        text
    }

    fn input_line(&self, show_cursor: bool) -> Line {
        let mut spans = vec![Span::raw(self.prompt.clone())];
        if !show_cursor {
            spans.push(Span::raw(self.input.text()));
            return Line { spans };
        }
        let cursor = self.input.cursor();
        let before: String = self.input.text().chars().take(cursor).collect();
        let at = self.input.text().chars().nth(cursor).unwrap_or(' ');
        let after: String = self.input.text().chars().skip(cursor + 1).collect();
        spans.push(Span::raw(before));
        spans.push(Span::styled(at.to_string(), Style::SELECTION));
        spans.push(Span::raw(after));
        Line { spans }
    }
}

impl Buffer for ConsoleBuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn line_count(&self, _ctx: &RenderContext<'_>) -> usize {
        self.transcript.len() + 1
    }

    fn lines<'a>(&'a self, first: usize, _view: &'a WindowState, ctx: &'a RenderContext<'a>) -> Lines<'a> {
        let prompt_line = std::iter::once_with(move || self.input_line(ctx.selected));
        Box::new(
            self.transcript
                .iter()
                .map(|line| Line::raw(line.as_str()))
                .chain(prompt_line)
                .skip(first),
        )
    }

    fn takes_input(&self) -> bool {
        true
    }

    fn insert_chars(&mut self, text: &str) {
        self.input.insert(text);
    }

    fn line_input_mut(&mut self) -> Option<&mut LineInput> {
        Some(&mut self.input)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BufferSpec for ConsoleBuffer {
    /// The console's name.
    type Args = String;

    fn create(name: &String, _session_log: &SessionLog) -> Self {
        Self {
            name: name.clone(),
            prompt: "> ".to_string(),
            input: LineInput::new(),
            transcript: Vec::new(),
            handler: None,
        }
    }
}

fn console_send() -> Action {
    Action::new("console-send", |engine: &mut Engine| {
        let Some(console) = engine.current_buffer_as_mut::<ConsoleBuffer>() else {
            return Ok(Signal::Continue);
        };
        let text = console.send();
        let handler = console.handler.clone();
        scroll_to_end(engine);
        match handler {
            Some(handler) => {
                let signal = handler(engine, &text)?;
                scroll_to_end(engine);
                Ok(signal)
            }
            None => Ok(Signal::Continue),
        }
    })
}

fn scroll_to_end(engine: &mut Engine) {
    let Some((count, rows)) = engine.selected_view_extent() else {
        return;
    };
    if let Some(state) = engine.selected_window_state_mut() {
        let last_page = count.saturating_sub(usize::from(rows.max(1)));
        state.set(FIRST_ROW, i64::try_from(last_page).unwrap_or(i64::MAX));
    }
}

// ---------------------------------------------------------------------------
// List capability
// ---------------------------------------------------------------------------

/// Move the selection, then scroll it into view.
fn move_selection(engine: &mut Engine, step: impl FnOnce(i64, i64, i64) -> i64) -> ActionResult {
    let Some((count, rows)) = engine.selected_view_extent() else {
        return Ok(Signal::Continue);
    };
    if count == 0 {
        return Ok(Signal::Continue);
    }
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    let rows = i64::from(rows.max(1));
    if let Some(state) = engine.selected_window_state_mut() {
        let target = step(state.get(SELECTED_ITEM), count, rows).clamp(0, count - 1);
        state.set(SELECTED_ITEM, target);
        let first = state.get(FIRST_ROW);
        if target < first || target >= first + rows {
            state.set(FIRST_ROW, (target - rows / 2).max(0));
        }
    }
    Ok(Signal::Continue)
}

fn list_action(name: &str, step: fn(i64, i64, i64) -> i64) -> Action {
    Action::new(name, move |engine: &mut Engine| move_selection(engine, step))
}

fn recenter() -> Action {
    Action::new("recenter", |engine: &mut Engine| {
        let Some((_, rows)) = engine.selected_view_extent() else {
            return Ok(Signal::Continue);
        };
        if let Some(state) = engine.selected_window_state_mut() {
            let selected = state.get(SELECTED_ITEM);
            state.set(FIRST_ROW, (selected - i64::from(rows) / 2).max(0));
        }
        Ok(Signal::Continue)
    })
}

fn select_item() -> Action {
    Action::new("select-item", |engine: &mut Engine| {
        let Some(index) = engine
            .selected_window()
            .map(|window| window.state().get(SELECTED_ITEM))
        else {
            return Ok(Signal::Continue);
        };
        let chosen = usize::try_from(index)
            .ok()
            .and_then(|index| engine.current_buffer_mut()?.on_item_selected(index));
        match chosen {
            Some(action) => action.call(engine),
            None => Ok(Signal::Continue),
        }
    })
}

/// Selection movement for buffers that show one item per line.
pub fn list_keymap() -> Result<Keymap<Action>, ChordParseError> {
    Keymap::from_table([
        ("<up>", list_action("previous-item", |selected, _, _| selected - 1)),
        ("<down>", list_action("next-item", |selected, _, _| selected + 1)),
        ("<pgup>", list_action("previous-page", |selected, _, rows| selected - rows)),
        ("<pgdown>", list_action("next-page", |selected, _, rows| selected + rows)),
        ("<home>", list_action("first-item", |_, _, _| 0)),
        ("<end>", list_action("last-item", |_, count, _| count - 1)),
        ("<enter>", select_item()),
        ("C-l", recenter()),
    ])
}

// ---------------------------------------------------------------------------
// Scroll capability
// ---------------------------------------------------------------------------

fn scroll_action(name: &str, step: fn(i64, i64) -> i64) -> Action {
    Action::new(name, move |engine: &mut Engine| {
        let Some((count, rows)) = engine.selected_view_extent() else {
            return Ok(Signal::Continue);
        };
        let last = i64::try_from(count.saturating_sub(1)).unwrap_or(i64::MAX);
        if let Some(state) = engine.selected_window_state_mut() {
            let first = step(state.get(FIRST_ROW), i64::from(rows.max(1)));
            state.set(FIRST_ROW, first.clamp(0, last));
        }
        Ok(Signal::Continue)
    })
}

/// Viewport scrolling that leaves the selection alone.
pub fn scroll_keymap() -> Result<Keymap<Action>, ChordParseError> {
    Keymap::from_table([
        ("S-<up>", scroll_action("scroll-up", |first, _| first - 1)),
        ("S-<down>", scroll_action("scroll-down", |first, _| first + 1)),
        ("S-<pgup>", scroll_action("scroll-page-up", |first, rows| first - rows)),
        ("S-<pgdown>", scroll_action("scroll-page-down", |first, rows| first + rows)),
    ])
}

// ---------------------------------------------------------------------------
// Line-editing capability
// ---------------------------------------------------------------------------

fn edit_action(name: &str, edit: fn(&mut LineInput)) -> Action {
    Action::new(name, move |engine: &mut Engine| {
        if let Some(input) = engine.focused_line_input_mut() {
            edit(input);
        }
        Ok(Signal::Continue)
    })
}

/// Editing keys for whatever line input has focus.
pub fn input_keymap() -> Result<Keymap<Action>, ChordParseError> {
    Keymap::from_table([
        ("C-a", edit_action("beginning-of-line", LineInput::move_home)),
        ("<home>", edit_action("beginning-of-line", LineInput::move_home)),
        ("C-e", edit_action("end-of-line", LineInput::move_end)),
        ("<end>", edit_action("end-of-line", LineInput::move_end)),
        ("<left>", edit_action("backward-char", |input| {
            input.move_left();
        })),
        ("C-b", edit_action("backward-char", |input| {
            input.move_left();
        })),
        ("<right>", edit_action("forward-char", |input| {
            input.move_right();
        })),
        ("C-f", edit_action("forward-char", |input| {
            input.move_right();
        })),
        ("<backspace>", edit_action("delete-backward-char", |input| {
            input.delete_backward();
        })),
        ("<del>", edit_action("delete-char", |input| {
            input.delete_forward();
        })),
        ("C-d", edit_action("delete-char", |input| {
            input.delete_forward();
        })),
        ("C-k", edit_action("kill-line", LineInput::kill_to_end)),
        ("<up>", edit_action("previous-history-element", LineInput::history_previous)),
        ("<down>", edit_action("next-history-element", LineInput::history_next)),
    ])
}

/// Install the class keymaps of the built-in buffers.
pub(crate) fn register_classes(engine: &mut Engine) -> Result<(), ChordParseError> {
    let list = list_keymap()?;
    let scroll = scroll_keymap()?;
    let input = input_keymap()?;
    let none = Keymap::new();
    engine.register_buffer_class::<LogBuffer>(&none, [&list, &scroll]);
    engine.register_buffer_class::<BufferListBuffer>(&none, [&list, &scroll]);
    let console = Keymap::from_table([("<enter>", console_send())])?;
    engine.register_buffer_class::<ConsoleBuffer>(&console, [&input, &scroll]);
    Ok(())
}
