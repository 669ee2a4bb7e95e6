#![forbid(unsafe_code)]

//! Buffers and the buffer registry.
//!
//! A buffer is a content provider shown in windows. Buffers are created
//! through [`BufferSpec`], whose serializable arguments form the identity key
//! together with the buffer's type: asking twice for the same type and
//! arguments yields the same buffer.
//!
//! The registry is an ordered list, most recently selected first. The order
//! drives next/previous buffer rotation and the buffer list display.

use std::any::{Any, TypeId};

use paned_core::keymap::Keymap;
use paned_core::text::Line;
use paned_layout::{BufferId, WindowState};
use serde::Serialize;

use crate::input::LineInput;
use crate::logging::SessionLog;
use crate::signal::Action;

/// What a buffer may consult while producing lines.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Names of all buffers in registry order.
    pub buffer_names: &'a [String],
    /// The session log.
    pub session_log: &'a SessionLog,
    /// Rows available in the window being rendered.
    pub rows: u16,
    /// Whether the window being rendered is the selected one.
    pub selected: bool,
}

/// Lazily produced display lines.
pub type Lines<'a> = Box<dyn Iterator<Item = Line> + 'a>;

/// A content provider.
pub trait Buffer: Any {
    /// Display name, shown in the mode line and the buffer list.
    fn name(&self) -> &str;

    /// Number of lines the buffer currently has.
    fn line_count(&self, ctx: &RenderContext<'_>) -> usize;

    /// Lines starting at row `first`, as seen through one window's view state.
    ///
    /// Called once per render pass and window; the iterator is consumed only
    /// as far as the window is tall.
    fn lines<'a>(
        &'a self,
        first: usize,
        view: &'a WindowState,
        ctx: &'a RenderContext<'a>,
    ) -> Lines<'a>;

    /// Whether unbound literal keys are inserted as text.
    fn takes_input(&self) -> bool {
        false
    }

    /// Insert typed text. Only called when [`Buffer::takes_input`] is true.
    fn insert_chars(&mut self, _text: &str) {}

    /// The line editor backing this buffer, if it has one.
    fn line_input_mut(&mut self) -> Option<&mut LineInput> {
        None
    }

    /// Bindings specific to this instance, consulted before its class keymap.
    fn keymap(&self) -> Option<&Keymap<Action>> {
        None
    }

    /// The action run when item `index` is chosen in a list view.
    fn on_item_selected(&self, _index: usize) -> Option<Action> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A buffer type that can be created by the registry.
pub trait BufferSpec: Buffer + Sized {
    /// Creation arguments. Their JSON form is part of the identity key.
    type Args: Serialize;

    fn create(args: &Self::Args, session_log: &SessionLog) -> Self;

    /// View state new windows start with.
    fn window_defaults(&self) -> WindowState {
        WindowState::new()
    }
}

/// Identity of a buffer: its type plus its serialized creation arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferKey {
    type_id: TypeId,
    args: String,
}

impl BufferKey {
    pub fn of<B: BufferSpec>(args: &B::Args) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_id: TypeId::of::<B>(),
            args: serde_json::to_string(args)?,
        })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

struct Entry {
    id: BufferId,
    key: BufferKey,
    buffer: Box<dyn Buffer>,
    window_defaults: WindowState,
}

/// The ordered buffer registry.
pub struct BufferList {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Default for BufferList {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl std::fmt::Debug for BufferList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.id, e.buffer.name())))
            .finish()
    }
}

impl BufferList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffer ids in registry order.
    pub fn ids(&self) -> Vec<BufferId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.buffer.name().to_string())
            .collect()
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: BufferId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<BufferId> {
        self.entries.get(index).map(|entry| entry.id)
    }

    pub fn find(&self, key: &BufferKey) -> Option<BufferId> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| entry.id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<BufferId> {
        self.entries
            .iter()
            .find(|entry| entry.buffer.name() == name)
            .map(|entry| entry.id)
    }

    pub fn get(&self, id: BufferId) -> Option<&dyn Buffer> {
        self.entry(id).map(|entry| entry.buffer.as_ref())
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut dyn Buffer> {
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;
        Some(entry.buffer.as_mut())
    }

    /// The buffer as its concrete type.
    pub fn get_as<B: Buffer>(&self, id: BufferId) -> Option<&B> {
        self.get(id)?.as_any().downcast_ref::<B>()
    }

    pub fn get_as_mut<B: Buffer>(&mut self, id: BufferId) -> Option<&mut B> {
        self.get_mut(id)?.as_any_mut().downcast_mut::<B>()
    }

    /// The concrete type of a buffer, used to find its class keymap.
    pub fn type_of(&self, id: BufferId) -> Option<TypeId> {
        self.entry(id).map(|entry| entry.key.type_id())
    }

    pub fn window_defaults(&self, id: BufferId) -> WindowState {
        self.entry(id)
            .map(|entry| entry.window_defaults.clone())
            .unwrap_or_default()
    }

    pub fn set_window_defaults(&mut self, id: BufferId, state: WindowState) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            entry.window_defaults = state;
        }
    }

    /// Create `B` with `args` and insert it at the front.
    pub fn create<B: BufferSpec>(
        &mut self,
        args: &B::Args,
        session_log: &SessionLog,
    ) -> Result<BufferId, serde_json::Error> {
        let key = BufferKey::of::<B>(args)?;
        let buffer = B::create(args, session_log);
        let window_defaults = buffer.window_defaults();
        let id = BufferId(self.next_id);
        self.next_id += 1;
        tracing::debug!(buffer = id.0, name = buffer.name(), "created buffer");
        self.entries.insert(
            0,
            Entry {
                id,
                key,
                buffer: Box::new(buffer),
                window_defaults,
            },
        );
        Ok(id)
    }

    /// The buffer with this identity, creating it when missing.
    pub fn get_or_create<B: BufferSpec>(
        &mut self,
        args: &B::Args,
        session_log: &SessionLog,
    ) -> Result<BufferId, serde_json::Error> {
        match self.find(&BufferKey::of::<B>(args)?) {
            Some(id) => Ok(id),
            None => self.create::<B>(args, session_log),
        }
    }

    /// Move a buffer to the front of the list.
    pub fn move_to_front(&mut self, id: BufferId) {
        if let Some(index) = self.position(id) {
            let entry = self.entries.remove(index);
            self.entries.insert(0, entry);
        }
    }

    /// The buffer after `id`, wrapping around.
    pub fn next_after(&self, id: BufferId) -> Option<BufferId> {
        let index = self.position(id)?;
        self.id_at((index + 1) % self.entries.len())
    }

    /// The buffer before `id`, wrapping around.
    pub fn previous_before(&self, id: BufferId) -> Option<BufferId> {
        let index = self.position(id)?;
        let len = self.entries.len();
        self.id_at((index + len - 1) % len)
    }

    /// Remove a buffer from the registry.
    pub fn remove(&mut self, id: BufferId) -> Option<Box<dyn Buffer>> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).buffer)
    }

    fn entry(&self, id: BufferId) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Note {
        title: String,
    }

    #[derive(Serialize)]
    struct NoteArgs {
        title: String,
    }

    impl Buffer for Note {
        fn name(&self) -> &str {
            &self.title
        }

        fn line_count(&self, _ctx: &RenderContext<'_>) -> usize {
            1
        }

        fn lines<'a>(
            &'a self,
            first: usize,
            _view: &'a WindowState,
            _ctx: &'a RenderContext<'a>,
        ) -> Lines<'a> {
            Box::new(std::iter::once(Line::raw(self.title.clone())).skip(first))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl BufferSpec for Note {
        type Args = NoteArgs;

        fn create(args: &NoteArgs, _log: &SessionLog) -> Self {
            Self {
                title: args.title.clone(),
            }
        }

        fn window_defaults(&self) -> WindowState {
            let mut state = WindowState::new();
            state.set("selected-item", 1);
            state
        }
    }

    fn args(title: &str) -> NoteArgs {
        NoteArgs {
            title: title.to_string(),
        }
    }

    #[test]
    fn identity_is_type_plus_args() {
        let log = SessionLog::default();
        let mut list = BufferList::new();
        let a = list.get_or_create::<Note>(&args("a"), &log).unwrap();
        let again = list.get_or_create::<Note>(&args("a"), &log).unwrap();
        let b = list.get_or_create::<Note>(&args("b"), &log).unwrap();
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(list.len(), 2);
        assert_eq!(list.type_of(a), Some(TypeId::of::<Note>()));
    }

    #[test]
    fn new_buffers_go_to_the_front() {
        let log = SessionLog::default();
        let mut list = BufferList::new();
        list.create::<Note>(&args("a"), &log).unwrap();
        list.create::<Note>(&args("b"), &log).unwrap();
        assert_eq!(list.names(), vec!["b", "a"]);
    }

    #[test]
    fn rotation_wraps() {
        let log = SessionLog::default();
        let mut list = BufferList::new();
        let a = list.create::<Note>(&args("a"), &log).unwrap();
        let b = list.create::<Note>(&args("b"), &log).unwrap();
        let c = list.create::<Note>(&args("c"), &log).unwrap();
        assert_eq!(list.next_after(a), Some(c));
        assert_eq!(list.previous_before(c), Some(a));
        assert_eq!(list.next_after(c), Some(b));
        list.move_to_front(a);
        assert_eq!(list.ids(), vec![a, c, b]);
    }

    #[test]
    fn downcast_and_defaults() {
        let log = SessionLog::default();
        let mut list = BufferList::new();
        let id = list.create::<Note>(&args("a"), &log).unwrap();
        assert_eq!(list.get_as::<Note>(id).unwrap().title, "a");
        assert_eq!(list.window_defaults(id).get("selected-item"), 1);
        list.get_as_mut::<Note>(id).unwrap().title = "renamed".into();
        assert_eq!(list.find_by_name("renamed"), Some(id));
        assert!(list.remove(id).is_some());
        assert!(list.is_empty());
    }
}
