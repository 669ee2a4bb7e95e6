#![forbid(unsafe_code)]

//! Built-in commands and the default bindings.

use paned_core::chord::ChordParseError;
use paned_core::keymap::Keymap;
use paned_layout::{Direction, LayoutError};

use crate::builtin::{self, BufferListBuffer, LogBuffer};
use crate::engine::Engine;
use crate::signal::{Action, ActionResult, Signal};

/// Run a layout operation, reporting a refusal as a message.
fn layout<T: 'static>(name: &str, op: fn(&mut Engine) -> Result<T, LayoutError>) -> Action {
    Action::new(name, move |engine: &mut Engine| {
        if let Err(err) = op(engine) {
            engine.message(err.to_string());
        }
        Ok(Signal::Continue)
    })
}

fn simple(name: &str, op: fn(&mut Engine)) -> Action {
    Action::new(name, move |engine: &mut Engine| {
        op(engine);
        Ok(Signal::Continue)
    })
}

/// Abort the current interaction.
pub fn cancel() -> Action {
    Action::new("cancel", |_: &mut Engine| Ok(Signal::Cancel))
}

pub fn exit() -> Action {
    Action::new("exit", |_: &mut Engine| Ok(Signal::Exit))
}

fn delete_other_windows(engine: &mut Engine) {
    engine.delete_all_windows();
}

fn next_window(engine: &mut Engine) {
    engine.select_next_window();
}

fn previous_window(engine: &mut Engine) {
    engine.select_previous_window();
}

fn window_left(engine: &mut Engine) {
    engine.select_direction(Direction::Left);
}

fn window_right(engine: &mut Engine) {
    engine.select_direction(Direction::Right);
}

fn window_up(engine: &mut Engine) {
    engine.select_direction(Direction::Up);
}

fn window_down(engine: &mut Engine) {
    engine.select_direction(Direction::Down);
}

fn next_buffer(engine: &mut Engine) {
    engine.switch_to_next_buffer();
}

fn previous_buffer(engine: &mut Engine) {
    engine.switch_to_previous_buffer();
}

fn new_window_set(engine: &mut Engine) {
    engine.new_window_set(None);
}

fn next_window_set(engine: &mut Engine) {
    engine.next_window_set();
}

fn previous_window_set(engine: &mut Engine) {
    engine.previous_window_set();
}

fn kill_current_buffer(engine: &mut Engine) -> ActionResult {
    engine.kill_current_buffer()?;
    Ok(Signal::Continue)
}

fn list_buffers(engine: &mut Engine) -> ActionResult {
    engine.switch_to_buffer::<BufferListBuffer>(&())?;
    Ok(Signal::Continue)
}

fn show_log(engine: &mut Engine) -> ActionResult {
    engine.switch_to_buffer::<LogBuffer>(&())?;
    Ok(Signal::Continue)
}

/// The default global keymap.
pub fn global_keymap() -> Result<Keymap<Action>, ChordParseError> {
    Keymap::from_table([
        ("C-x 2", layout("split-window-below", Engine::split_below)),
        ("C-x 3", layout("split-window-right", Engine::split_right)),
        ("C-x 0", layout("delete-window", Engine::delete_selected_window)),
        ("C-x 1", simple("delete-other-windows", delete_other_windows)),
        ("M-n", simple("next-window", next_window)),
        ("M-p", simple("previous-window", previous_window)),
        ("M-<left>", simple("window-left", window_left)),
        ("M-<right>", simple("window-right", window_right)),
        ("M-<up>", simple("window-up", window_up)),
        ("M-<down>", simple("window-down", window_down)),
        ("<tab>", simple("next-buffer", next_buffer)),
        ("S-<tab>", simple("previous-buffer", previous_buffer)),
        ("C-x C-k", Action::new("kill-buffer", kill_current_buffer)),
        ("C-x C-b", Action::new("list-buffers", list_buffers)),
        ("C-x C-l", Action::new("show-log", show_log)),
        ("C-x 5 2", simple("new-window-set", new_window_set)),
        ("C-x 5 0", layout("delete-window-set", Engine::delete_active_window_set)),
        ("C-M-<right>", simple("next-window-set", next_window_set)),
        ("C-M-<left>", simple("previous-window-set", previous_window_set)),
        ("C-x C-c", exit()),
    ])
}

fn minibuffer_submit() -> Action {
    Action::new("minibuffer-submit", |engine: &mut Engine| engine.minibuffer_submit())
}

/// Bindings active while a minibuffer read has focus.
pub fn minibuffer_keymap() -> Result<Keymap<Action>, ChordParseError> {
    let own = Keymap::from_table([
        ("<enter>", minibuffer_submit()),
        ("C-j", minibuffer_submit()),
        ("<tab>", simple("minibuffer-complete", Engine::minibuffer_complete)),
    ])?;
    Ok(Keymap::composed(&own, [&builtin::input_keymap()?]))
}

#[cfg(test)]
mod tests {
    use paned_core::keymap::Lookup;

    use super::*;

    fn resolves(keymap: &Keymap<Action>, keys: &str) -> Option<String> {
        let sequence: paned_core::chord::ChordSequence = keys.parse().unwrap();
        match keymap.lookup(sequence.as_slice()) {
            Lookup::Matched(action) => Some(action.name().to_string()),
            _ => None,
        }
    }

    #[test]
    fn default_bindings() {
        let keymap = global_keymap().unwrap();
        assert_eq!(resolves(&keymap, "C-x 2").as_deref(), Some("split-window-below"));
        assert_eq!(resolves(&keymap, "C-x 5 0").as_deref(), Some("delete-window-set"));
        assert_eq!(resolves(&keymap, "C-x C-c").as_deref(), Some("exit"));
        assert_eq!(resolves(&keymap, "S-<tab>").as_deref(), Some("previous-buffer"));
        assert!(matches!(
            keymap.lookup("C-x 5".parse::<paned_core::chord::ChordSequence>().unwrap().as_slice()),
            Lookup::Pending
        ));
    }

    #[test]
    fn minibuffer_keys_shadow_editing_keys() {
        let keymap = minibuffer_keymap().unwrap();
        assert_eq!(resolves(&keymap, "<enter>").as_deref(), Some("minibuffer-submit"));
        assert_eq!(resolves(&keymap, "<tab>").as_deref(), Some("minibuffer-complete"));
        assert_eq!(resolves(&keymap, "C-a").as_deref(), Some("beginning-of-line"));
    }
}
