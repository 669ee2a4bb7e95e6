#![forbid(unsafe_code)]

//! Decoded input events.
//!
//! The engine consumes a stream of [`InputEvent`]s: chords tagged with whether
//! they are literal text, plus a distinguished resize notification. Terminal
//! backends produce them; [`decode_crossterm`] covers the crossterm one.
//!
//! # Design Notes
//!
//! - Shift is folded into the character for printable keys (`'A'`, not
//!   `S-a`) and kept as `S-` for symbolic keys (`S-<tab>`).
//! - Alt maps to the `M-` prefix.
//! - Key release events are dropped.
//! - A bracketed paste becomes one literal chord per character.

#[cfg(not(target_arch = "wasm32"))]
use crossterm::event as cte;

use crate::chord::{Chord, ChordModifiers, NamedKey};

/// One decoded input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A keypress.
    Chord {
        chord: Chord,
        /// `true` when the chord is plain text the user typed.
        literal: bool,
    },
    /// The terminal changed size; the engine re-reads the surface dimensions.
    Resize,
}

impl InputEvent {
    /// A literal character chord.
    pub const fn text(c: char) -> Self {
        Self::Chord {
            chord: Chord::char(c),
            literal: true,
        }
    }

    /// A non-literal chord.
    pub const fn key(chord: Chord) -> Self {
        Self::Chord {
            chord,
            literal: false,
        }
    }
}

impl From<Chord> for InputEvent {
    /// Unmodified characters are literal; everything else is not.
    fn from(chord: Chord) -> Self {
        let literal = chord.literal_text().is_some();
        Self::Chord { chord, literal }
    }
}

/// Convert a crossterm event into input events.
#[cfg(not(target_arch = "wasm32"))]
pub fn decode_crossterm(event: &cte::Event) -> Vec<InputEvent> {
    match event {
        cte::Event::Key(key) if key.kind != cte::KeyEventKind::Release => {
            decode_key(key).into_iter().collect()
        }
        cte::Event::Resize(_, _) => vec![InputEvent::Resize],
        cte::Event::Paste(text) => text
            .chars()
            .filter(|c| !c.is_control())
            .map(InputEvent::text)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn decode_key(key: &cte::KeyEvent) -> Option<InputEvent> {
    let mut modifiers = ChordModifiers::empty();
    if key.modifiers.contains(cte::KeyModifiers::CONTROL) {
        modifiers |= ChordModifiers::CTRL;
    }
    if key.modifiers.contains(cte::KeyModifiers::ALT) {
        modifiers |= ChordModifiers::META;
    }
    let shift = if key.modifiers.contains(cte::KeyModifiers::SHIFT) {
        ChordModifiers::SHIFT
    } else {
        ChordModifiers::empty()
    };

    let chord = match key.code {
        cte::KeyCode::Char(c) => {
            let chord = Chord::char(c).with_modifiers(modifiers);
            return Some(InputEvent::from(chord));
        }
        cte::KeyCode::Null => Chord::char(' ').with_modifiers(ChordModifiers::CTRL),
        cte::KeyCode::BackTab => {
            Chord::named(NamedKey::Tab).with_modifiers(modifiers | ChordModifiers::SHIFT)
        }
        code => {
            let named = map_named(code)?;
            Chord::named(named).with_modifiers(modifiers | shift)
        }
    };
    Some(InputEvent::key(chord))
}

#[cfg(not(target_arch = "wasm32"))]
fn map_named(code: cte::KeyCode) -> Option<NamedKey> {
    let named = match code {
        cte::KeyCode::Backspace => NamedKey::Backspace,
        cte::KeyCode::Enter => NamedKey::Enter,
        cte::KeyCode::Left => NamedKey::Left,
        cte::KeyCode::Right => NamedKey::Right,
        cte::KeyCode::Up => NamedKey::Up,
        cte::KeyCode::Down => NamedKey::Down,
        cte::KeyCode::Home => NamedKey::Home,
        cte::KeyCode::End => NamedKey::End,
        cte::KeyCode::PageUp => NamedKey::PageUp,
        cte::KeyCode::PageDown => NamedKey::PageDown,
        cte::KeyCode::Tab => NamedKey::Tab,
        cte::KeyCode::Delete => NamedKey::Del,
        cte::KeyCode::Insert => NamedKey::Insert,
        cte::KeyCode::Esc => NamedKey::Esc,
        cte::KeyCode::F(n) if (1..=12).contains(&n) => NamedKey::F(n),
        _ => return None,
    };
    Some(named)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crossterm::event as ct_event;

    fn key(code: ct_event::KeyCode, modifiers: ct_event::KeyModifiers) -> ct_event::Event {
        ct_event::Event::Key(ct_event::KeyEvent {
            code,
            modifiers,
            kind: ct_event::KeyEventKind::Press,
            state: ct_event::KeyEventState::NONE,
        })
    }

    fn one(event: ct_event::Event) -> InputEvent {
        let mut decoded = decode_crossterm(&event);
        assert_eq!(decoded.len(), 1, "expected one event from {event:?}");
        decoded.remove(0)
    }

    #[test]
    fn plain_char_is_literal() {
        let ev = one(key(ct_event::KeyCode::Char('a'), ct_event::KeyModifiers::NONE));
        assert_eq!(ev, InputEvent::text('a'));
    }

    #[test]
    fn shifted_char_folds_shift() {
        let ev = one(key(ct_event::KeyCode::Char('A'), ct_event::KeyModifiers::SHIFT));
        assert_eq!(ev, InputEvent::text('A'));
    }

    #[test]
    fn ctrl_char_is_not_literal() {
        let ev = one(key(ct_event::KeyCode::Char('x'), ct_event::KeyModifiers::CONTROL));
        assert_eq!(ev, InputEvent::key("C-x".parse().unwrap()));
    }

    #[test]
    fn alt_maps_to_meta() {
        let ev = one(key(ct_event::KeyCode::Char('n'), ct_event::KeyModifiers::ALT));
        assert_eq!(ev, InputEvent::key("M-n".parse().unwrap()));
    }

    #[test]
    fn named_keys_keep_shift() {
        let ev = one(key(ct_event::KeyCode::Up, ct_event::KeyModifiers::SHIFT));
        assert_eq!(ev, InputEvent::key("S-<up>".parse().unwrap()));
        let ev = one(key(ct_event::KeyCode::BackTab, ct_event::KeyModifiers::SHIFT));
        assert_eq!(ev, InputEvent::key("S-<tab>".parse().unwrap()));
    }

    #[test]
    fn ctrl_meta_arrow() {
        let ev = one(key(
            ct_event::KeyCode::Right,
            ct_event::KeyModifiers::CONTROL | ct_event::KeyModifiers::ALT,
        ));
        assert_eq!(ev, InputEvent::key("C-M-<right>".parse().unwrap()));
    }

    #[test]
    fn escape_and_delete() {
        let ev = one(key(ct_event::KeyCode::Esc, ct_event::KeyModifiers::NONE));
        assert_eq!(ev, InputEvent::key("<esc>".parse().unwrap()));
        let ev = one(key(ct_event::KeyCode::Delete, ct_event::KeyModifiers::NONE));
        assert_eq!(ev, InputEvent::key("<del>".parse().unwrap()));
    }

    #[test]
    fn high_function_keys_are_dropped() {
        let event = key(ct_event::KeyCode::F(13), ct_event::KeyModifiers::NONE);
        assert!(decode_crossterm(&event).is_empty());
    }

    #[test]
    fn release_is_dropped() {
        let event = ct_event::Event::Key(ct_event::KeyEvent {
            code: ct_event::KeyCode::Char('a'),
            modifiers: ct_event::KeyModifiers::NONE,
            kind: ct_event::KeyEventKind::Release,
            state: ct_event::KeyEventState::NONE,
        });
        assert!(decode_crossterm(&event).is_empty());
    }

    #[test]
    fn resize_is_distinguished() {
        assert_eq!(one(ct_event::Event::Resize(100, 40)), InputEvent::Resize);
    }

    #[test]
    fn paste_expands_to_literals() {
        let decoded = decode_crossterm(&ct_event::Event::Paste("hi\n".into()));
        assert_eq!(decoded, vec![InputEvent::text('h'), InputEvent::text('i')]);
    }
}
