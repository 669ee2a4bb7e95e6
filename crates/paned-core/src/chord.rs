#![forbid(unsafe_code)]

//! Key chords and chord sequences.
//!
//! A [`Chord`] is one normalized keypress: optional modifier prefixes in the
//! canonical order `C-`, `M-`, `S-`, followed by either a single printable
//! character or a bracketed symbolic name such as `<up>` or `<f5>`.
//!
//! A [`ChordSequence`] is a whitespace-separated list of chords forming a
//! (possibly partial) key binding, e.g. `"C-x 5 2"`.
//!
//! # Invariants
//!
//! - Parsing and `Display` round-trip: `chord.to_string().parse() == Ok(chord)`.
//! - Modifier order in the textual form never depends on input order:
//!   `"S-C-<up>"` and `"C-S-<up>"` parse to the same chord and both print as
//!   `"C-S-<up>"`.
//! - A literal space is written `<space>` so sequences stay splittable on
//!   whitespace.
//!
//! # Example
//!
//! ```
//! use paned_core::chord::{Chord, ChordSequence};
//!
//! let chord: Chord = "M-C-<left>".parse().unwrap();
//! assert_eq!(chord.to_string(), "C-M-<left>");
//!
//! let seq: ChordSequence = "C-x 2".parse().unwrap();
//! assert_eq!(seq.len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

bitflags! {
    /// Modifier prefixes a chord may carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct ChordModifiers: u8 {
        /// `C-`
        const CTRL  = 0b001;
        /// `M-` (Alt, or an Escape prefix).
        const META  = 0b010;
        /// `S-`
        const SHIFT = 0b100;
    }
}

impl ChordModifiers {
    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'C' => Some(Self::CTRL),
            'M' => Some(Self::META),
            'S' => Some(Self::SHIFT),
            _ => None,
        }
    }
}

/// Symbolic keys written in angle brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamedKey {
    /// `<f1>` through `<f12>`.
    F(u8),
    Tab,
    Del,
    Enter,
    Backspace,
    Esc,
    Insert,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
}

impl NamedKey {
    /// Look up a bracketed name (without the brackets).
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "tab" => Self::Tab,
            "del" => Self::Del,
            "enter" => Self::Enter,
            "backspace" => Self::Backspace,
            "esc" => Self::Esc,
            "insert" => Self::Insert,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "pgup" => Self::PageUp,
            "pgdown" => Self::PageDown,
            "home" => Self::Home,
            "end" => Self::End,
            other => {
                let n: u8 = other.strip_prefix('f')?.parse().ok()?;
                if (1..=12).contains(&n) {
                    Self::F(n)
                } else {
                    return None;
                }
            }
        };
        Some(key)
    }

    /// Canonical bracketed name (without the brackets).
    pub fn name(self) -> String {
        match self {
            Self::F(n) => format!("f{n}"),
            Self::Tab => "tab".into(),
            Self::Del => "del".into(),
            Self::Enter => "enter".into(),
            Self::Backspace => "backspace".into(),
            Self::Esc => "esc".into(),
            Self::Insert => "insert".into(),
            Self::Up => "up".into(),
            Self::Down => "down".into(),
            Self::Left => "left".into(),
            Self::Right => "right".into(),
            Self::PageUp => "pgup".into(),
            Self::PageDown => "pgdown".into(),
            Self::Home => "home".into(),
            Self::End => "end".into(),
        }
    }
}

/// The key part of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A single printable character.
    Char(char),
    /// A bracketed symbolic key.
    Named(NamedKey),
}

/// One normalized keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chord {
    pub modifiers: ChordModifiers,
    pub key: Key,
}

impl Chord {
    /// A printable character without modifiers.
    pub const fn char(c: char) -> Self {
        Self {
            modifiers: ChordModifiers::empty(),
            key: Key::Char(c),
        }
    }

    /// A symbolic key without modifiers.
    pub const fn named(key: NamedKey) -> Self {
        Self {
            modifiers: ChordModifiers::empty(),
            key: Key::Named(key),
        }
    }

    /// Add modifiers to this chord.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: ChordModifiers) -> Self {
        self.modifiers = self.modifiers.union(modifiers);
        self
    }

    /// The text this chord inserts when typed as literal input.
    ///
    /// Only unmodified character chords have a literal form.
    pub fn literal_text(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if self.modifiers.is_empty() => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(ChordModifiers::CTRL) {
            f.write_str("C-")?;
        }
        if self.modifiers.contains(ChordModifiers::META) {
            f.write_str("M-")?;
        }
        if self.modifiers.contains(ChordModifiers::SHIFT) {
            f.write_str("S-")?;
        }
        match self.key {
            Key::Char(' ') => f.write_str("<space>"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Named(named) => write!(f, "<{}>", named.name()),
        }
    }
}

/// Why a chord string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChordParseError {
    /// The input (or one sequence element) was empty.
    Empty,
    /// A prefix other than `C`, `M` or `S` preceded a `-`.
    UnknownModifier(char),
    /// A bracketed name that is not a known key, or a multi-character literal.
    UnknownKeyName(String),
    /// A `<` without a closing `>`.
    UnterminatedKeyName(String),
    /// Modifiers with nothing after them, e.g. `"C-"`.
    MissingKey(String),
}

impl fmt::Display for ChordParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty keychord"),
            Self::UnknownModifier(m) => write!(f, "unknown modifier '{m}'"),
            Self::UnknownKeyName(name) => write!(f, "unknown key '{name}'"),
            Self::UnterminatedKeyName(name) => write!(f, "unterminated key name '{name}'"),
            Self::MissingKey(chord) => write!(f, "keychord '{chord}' has no key"),
        }
    }
}

impl std::error::Error for ChordParseError {}

impl FromStr for Chord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ChordParseError::Empty);
        }

        let mut modifiers = ChordModifiers::empty();
        let mut rest = s;
        loop {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(prefix), Some('-')) if rest.len() > 1 && !rest.starts_with('<') => {
                    let modifier = ChordModifiers::from_prefix(prefix)
                        .ok_or(ChordParseError::UnknownModifier(prefix))?;
                    modifiers |= modifier;
                    rest = &rest[prefix.len_utf8() + 1..];
                }
                _ => break,
            }
        }

        if rest.is_empty() {
            return Err(ChordParseError::MissingKey(s.to_string()));
        }

        let key = if let Some(inner) = rest.strip_prefix('<') {
            if rest.len() == 1 {
                Key::Char('<')
            } else {
                let name = inner
                    .strip_suffix('>')
                    .ok_or_else(|| ChordParseError::UnterminatedKeyName(rest.to_string()))?;
                if name == "space" {
                    Key::Char(' ')
                } else {
                    NamedKey::from_name(name)
                        .map(Key::Named)
                        .ok_or_else(|| ChordParseError::UnknownKeyName(name.to_string()))?
                }
            }
        } else {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => return Err(ChordParseError::UnknownKeyName(rest.to_string())),
            }
        };

        Ok(Self { modifiers, key })
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

/// An ordered list of chords, written space-separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ChordSequence(Vec<Chord>);

impl ChordSequence {
    /// An empty sequence.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, chord: Chord) {
        self.0.push(chord);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Chord] {
        &self.0
    }
}

impl From<Vec<Chord>> for ChordSequence {
    fn from(chords: Vec<Chord>) -> Self {
        Self(chords)
    }
}

impl From<Chord> for ChordSequence {
    fn from(chord: Chord) -> Self {
        Self(vec![chord])
    }
}

impl FromStr for ChordSequence {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chords = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Chord>, _>>()?;
        if chords.is_empty() {
            return Err(ChordParseError::Empty);
        }
        Ok(Self(chords))
    }
}

impl fmt::Display for ChordSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chord) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{chord}")?;
        }
        Ok(())
    }
}
