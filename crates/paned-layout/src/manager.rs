#![forbid(unsafe_code)]

//! The window manager: an ordered list of window sets.
//!
//! Exactly one set is active and rendered. Sets may carry a name; names are
//! stored with their set, so inserting or deleting sets never leaves a name
//! pointing at the wrong index.
//!
//! Index rules:
//! - A new set is inserted right after the active one and becomes active.
//! - The set at index 0 is never deleted.
//! - Deleting index `i` with `i <= active` moves the active index down by one.

use paned_core::geometry::Rect;
use paned_core::surface::ScreenSurface;

use crate::error::LayoutError;
use crate::window::{BufferId, Window, WindowId, WindowIdAllocator, WindowState};
use crate::window_set::{Direction, LayoutConfig, WindowSet};

#[derive(Debug, Clone)]
struct Entry {
    name: Option<String>,
    set: WindowSet,
}

/// Owner of every window set.
#[derive(Debug, Clone)]
pub struct WindowManager {
    config: LayoutConfig,
    ids: WindowIdAllocator,
    sets: Vec<Entry>,
    active: usize,
}

impl WindowManager {
    /// Create a manager with one set showing `buffer` over `area`.
    pub fn new(
        area: Rect,
        buffer: BufferId,
        state: WindowState,
        config: LayoutConfig,
        surface: &mut dyn ScreenSurface,
    ) -> Self {
        let mut ids = WindowIdAllocator::default();
        let set = WindowSet::new(area, buffer, state, config, &mut ids, surface);
        Self {
            config,
            ids,
            sets: vec![Entry { name: None, set }],
            active: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Window sets
    // -----------------------------------------------------------------------

    /// Number of window sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &WindowSet {
        &self.sets[self.active].set
    }

    pub fn active_mut(&mut self) -> &mut WindowSet {
        &mut self.sets[self.active].set
    }

    pub fn window_set(&self, index: usize) -> Option<&WindowSet> {
        self.sets.get(index).map(|entry| &entry.set)
    }

    pub fn window_sets(&self) -> impl Iterator<Item = &WindowSet> + '_ {
        self.sets.iter().map(|entry| &entry.set)
    }

    /// Name of the set at `index`.
    pub fn window_set_name(&self, index: usize) -> Option<&str> {
        self.sets.get(index)?.name.as_deref()
    }

    /// Index of the set called `name`.
    pub fn window_set_index(&self, name: &str) -> Option<usize> {
        self.sets
            .iter()
            .position(|entry| entry.name.as_deref() == Some(name))
    }

    pub fn has_window_set(&self, name: &str) -> bool {
        self.window_set_index(name).is_some()
    }

    /// Create a window set after the active one and activate it.
    ///
    /// A name that already exists returns that set's index and changes
    /// nothing.
    pub fn new_window_set(
        &mut self,
        name: Option<&str>,
        buffer: BufferId,
        state: WindowState,
        surface: &mut dyn ScreenSurface,
    ) -> usize {
        if let Some(index) = name.and_then(|name| self.window_set_index(name)) {
            return index;
        }
        let area = self.active().area();
        let set = WindowSet::new(area, buffer, state, self.config, &mut self.ids, surface);
        let index = self.active + 1;
        self.sets.insert(
            index,
            Entry {
                name: name.map(str::to_string),
                set,
            },
        );
        self.active = index;
        tracing::debug!(index, name, "created window set");
        index
    }

    /// Delete the set at `index`.
    pub fn delete_window_set(
        &mut self,
        index: usize,
        surface: &mut dyn ScreenSurface,
    ) -> Result<(), LayoutError> {
        if index == 0 {
            return Err(LayoutError::CannotDeletePrimordialSet);
        }
        if index >= self.sets.len() {
            return Err(LayoutError::UnknownWindowSetIndex(index));
        }
        let entry = self.sets.remove(index);
        entry.set.release_regions(surface);
        if index <= self.active {
            self.active -= 1;
        }
        tracing::debug!(index, active = self.active, "deleted window set");
        Ok(())
    }

    /// Delete the set called `name`.
    pub fn delete_window_set_by_name(
        &mut self,
        name: &str,
        surface: &mut dyn ScreenSurface,
    ) -> Result<(), LayoutError> {
        let index = self
            .window_set_index(name)
            .ok_or_else(|| LayoutError::UnknownWindowSet(name.to_string()))?;
        self.delete_window_set(index, surface)
    }

    /// Delete the active set.
    pub fn delete_active_window_set(
        &mut self,
        surface: &mut dyn ScreenSurface,
    ) -> Result<(), LayoutError> {
        self.delete_window_set(self.active, surface)
    }

    /// Activate the next set, wrapping around.
    pub fn next_window_set(&mut self) -> usize {
        self.active = (self.active + 1) % self.sets.len();
        self.active
    }

    /// Activate the previous set, wrapping around.
    pub fn previous_window_set(&mut self) -> usize {
        self.active = (self.active + self.sets.len() - 1) % self.sets.len();
        self.active
    }

    /// Activate the set at `index`.
    pub fn select_window_set(&mut self, index: usize) -> Result<(), LayoutError> {
        if index >= self.sets.len() {
            return Err(LayoutError::UnknownWindowSetIndex(index));
        }
        self.active = index;
        Ok(())
    }

    /// Resize every set to a new area.
    pub fn resize(&mut self, area: Rect, surface: &mut dyn ScreenSurface) {
        for entry in &mut self.sets {
            entry.set.resize(area, surface);
        }
    }

    // -----------------------------------------------------------------------
    // Windows of the active set
    // -----------------------------------------------------------------------

    pub fn selected_window(&self) -> Option<&Window> {
        self.active().selected_window()
    }

    pub fn selected_window_mut(&mut self) -> Option<&mut Window> {
        self.active_mut().selected_window_mut()
    }

    pub fn split_below(
        &mut self,
        state: &WindowState,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        let set = &mut self.sets[self.active].set;
        set.split_below(state, &mut self.ids, surface)
    }

    pub fn split_right(
        &mut self,
        state: &WindowState,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        let set = &mut self.sets[self.active].set;
        set.split_right(state, &mut self.ids, surface)
    }

    pub fn delete_selected_window(
        &mut self,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        self.active_mut().delete_selected(surface)
    }

    pub fn delete_all_windows(&mut self, surface: &mut dyn ScreenSurface) -> usize {
        self.active_mut().delete_all_windows(surface)
    }

    pub fn select_next_window(&mut self) -> WindowId {
        self.active_mut().select_next_window()
    }

    pub fn select_previous_window(&mut self) -> WindowId {
        self.active_mut().select_previous_window()
    }

    pub fn select_direction(&mut self, direction: Direction) -> WindowId {
        self.active_mut().select_direction(direction)
    }

    // -----------------------------------------------------------------------
    // Windows across sets
    // -----------------------------------------------------------------------

    /// Select `window` in whichever set holds it, activating that set.
    pub fn select_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        let index = self
            .sets
            .iter()
            .position(|entry| entry.set.contains_window(window))
            .ok_or(LayoutError::UnknownWindow(window))?;
        self.sets[index].set.select_window(window)?;
        self.active = index;
        Ok(())
    }

    /// First window matching `predicate`, searching the active set first.
    ///
    /// With `current_set_only` the other sets are not searched.
    pub fn find_window(
        &self,
        mut predicate: impl FnMut(&Window) -> bool,
        current_set_only: bool,
    ) -> Option<WindowId> {
        if let Some(found) = self.active().find_window(&mut predicate) {
            return Some(found);
        }
        if current_set_only {
            return None;
        }
        self.sets
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.active)
            .find_map(|(_, entry)| entry.set.find_window(&mut predicate))
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.sets.iter().find_map(|entry| entry.set.window(id))
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.sets
            .iter_mut()
            .find_map(|entry| entry.set.window_mut(id))
    }

    /// Every window in every set showing `buffer`.
    pub fn windows_showing(&self, buffer: BufferId) -> Vec<WindowId> {
        self.sets
            .iter()
            .flat_map(|entry| entry.set.windows())
            .filter(|window| window.buffer() == buffer)
            .map(Window::id)
            .collect()
    }

    /// Rebind every window showing `old` to `new`. Returns the count.
    pub fn replace_buffer(&mut self, old: BufferId, new: BufferId, state: &WindowState) -> usize {
        self.sets
            .iter_mut()
            .map(|entry| entry.set.replace_buffer(old, new, state))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paned_core::surface::HeadlessSurface;

    fn manager() -> (WindowManager, HeadlessSurface) {
        let mut surface = HeadlessSurface::new(25, 80);
        let wm = WindowManager::new(
            Rect::from_size(80, 24),
            BufferId(1),
            WindowState::new(),
            LayoutConfig::default(),
            &mut surface,
        );
        (wm, surface)
    }

    fn add_set(wm: &mut WindowManager, surface: &mut HeadlessSurface, name: Option<&str>) -> usize {
        wm.new_window_set(name, BufferId(1), WindowState::new(), surface)
    }

    #[test]
    fn starts_with_one_active_set() {
        let (wm, _) = manager();
        assert_eq!(wm.len(), 1);
        assert_eq!(wm.active_index(), 0);
        assert!(wm.selected_window().is_some());
    }

    #[test]
    fn new_set_is_inserted_after_active_and_activated() {
        let (mut wm, mut surface) = manager();
        assert_eq!(add_set(&mut wm, &mut surface, Some("mail")), 1);
        assert_eq!(add_set(&mut wm, &mut surface, Some("irc")), 2);
        wm.select_window_set(0).unwrap();
        assert_eq!(add_set(&mut wm, &mut surface, None), 1);
        assert_eq!(wm.window_set_index("mail"), Some(2));
        assert_eq!(wm.window_set_index("irc"), Some(3));
    }

    #[test]
    fn existing_name_returns_existing_set() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, Some("mail"));
        wm.select_window_set(0).unwrap();
        assert_eq!(add_set(&mut wm, &mut surface, Some("mail")), 1);
        assert_eq!(wm.len(), 2);
        assert_eq!(wm.active_index(), 0);
        assert!(wm.has_window_set("mail"));
        assert!(!wm.has_window_set("news"));
    }

    #[test]
    fn primordial_set_cannot_be_deleted() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, None);
        assert_eq!(
            wm.delete_window_set(0, &mut surface),
            Err(LayoutError::CannotDeletePrimordialSet)
        );
        assert_eq!(wm.len(), 2);
    }

    #[test]
    fn deleting_at_or_below_active_decrements_active() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, None);
        add_set(&mut wm, &mut surface, None);
        add_set(&mut wm, &mut surface, None);
        assert_eq!(wm.active_index(), 3);

        wm.delete_window_set(1, &mut surface).unwrap();
        assert_eq!(wm.active_index(), 2);

        wm.delete_window_set(2, &mut surface).unwrap();
        assert_eq!(wm.active_index(), 1);
        assert_eq!(wm.len(), 2);
    }

    #[test]
    fn deleting_above_active_keeps_active() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, None);
        add_set(&mut wm, &mut surface, None);
        wm.select_window_set(1).unwrap();
        wm.delete_window_set(2, &mut surface).unwrap();
        assert_eq!(wm.active_index(), 1);
    }

    #[test]
    fn deleting_a_set_releases_its_regions() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, Some("x"));
        assert_eq!(surface.region_count(), 2);
        wm.delete_window_set_by_name("x", &mut surface).unwrap();
        assert_eq!(surface.region_count(), 1);
        assert_eq!(
            wm.delete_window_set_by_name("x", &mut surface),
            Err(LayoutError::UnknownWindowSet("x".into()))
        );
    }

    #[test]
    fn set_rotation_wraps() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, None);
        add_set(&mut wm, &mut surface, None);
        assert_eq!(wm.next_window_set(), 0);
        assert_eq!(wm.previous_window_set(), 2);
        assert_eq!(wm.previous_window_set(), 1);
    }

    #[test]
    fn select_window_switches_active_set() {
        let (mut wm, mut surface) = manager();
        let first = wm.selected_window().unwrap().id();
        add_set(&mut wm, &mut surface, None);
        assert_eq!(wm.active_index(), 1);
        wm.select_window(first).unwrap();
        assert_eq!(wm.active_index(), 0);
    }

    #[test]
    fn find_window_respects_scope() {
        let (mut wm, mut surface) = manager();
        wm.new_window_set(None, BufferId(5), WindowState::new(), &mut surface);
        wm.select_window_set(0).unwrap();
        assert!(wm.find_window(|w| w.buffer() == BufferId(5), true).is_none());
        assert!(wm.find_window(|w| w.buffer() == BufferId(5), false).is_some());
    }

    #[test]
    fn replace_buffer_across_sets() {
        let (mut wm, mut surface) = manager();
        add_set(&mut wm, &mut surface, None);
        wm.split_below(&WindowState::new(), &mut surface).unwrap();
        assert_eq!(wm.windows_showing(BufferId(1)).len(), 3);
        assert_eq!(wm.replace_buffer(BufferId(1), BufferId(2), &WindowState::new()), 3);
        assert!(wm.windows_showing(BufferId(1)).is_empty());
    }

    #[test]
    fn window_ids_are_unique_across_sets() {
        let (mut wm, mut surface) = manager();
        let a = wm.selected_window().unwrap().id();
        add_set(&mut wm, &mut surface, None);
        let b = wm.selected_window().unwrap().id();
        assert_ne!(a, b);
    }
}
