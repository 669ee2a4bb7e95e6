#![forbid(unsafe_code)]

//! Chord-sequence keymaps.
//!
//! A [`Keymap`] is a trie keyed by [`Chord`]: every entry is either an action
//! or a nested keymap holding the continuations of a prefix. Looking up a
//! sequence walks the nested maps and yields one of three outcomes:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | [`Lookup::Matched`] | the whole sequence names an action |
//! | [`Lookup::Pending`] | the sequence is a strict prefix of a longer binding |
//! | [`Lookup::NoMatch`] | some chord has no entry at its level |
//!
//! # Composition
//!
//! Capability keymaps compose by [`Keymap::merge_from`]: bindings from the
//! other map are copied only where this map has none, so the first definition
//! of a chord wins. Nested prefixes merge recursively. Composed maps are flat
//! values; there is no runtime parent lookup.
//!
//! # Rebinding
//!
//! [`Keymap::bind`] replaces whatever the sequence previously named, but never
//! silently: clobbering an action, or replacing a prefix with an action (and
//! vice versa), emits a `tracing` warning and returns the old binding.
//!
//! The action type is generic; the runtime stores callable handles here.

use std::collections::BTreeMap;

use crate::chord::{Chord, ChordParseError, ChordSequence};

/// One keymap entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding<A> {
    /// The sequence ending here runs this action.
    Action(A),
    /// The sequence ending here is a prefix of longer bindings.
    Prefix(Keymap<A>),
}

/// Result of resolving a chord sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a, A> {
    Matched(&'a A),
    Pending,
    NoMatch,
}

impl<A> Lookup<'_, A> {
    /// Returns `true` for [`Lookup::NoMatch`].
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }
}

/// A trie from chord sequences to actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap<A> {
    entries: BTreeMap<Chord, Binding<A>>,
}

impl<A> Default for Keymap<A> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<A: Clone> Keymap<A> {
    /// Create an empty keymap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keymap from a declarative `(sequence, action)` table.
    ///
    /// Later rows rebind earlier ones (with a warning).
    pub fn from_table<'s, I>(table: I) -> Result<Self, ChordParseError>
    where
        I: IntoIterator<Item = (&'s str, A)>,
    {
        let mut keymap = Self::new();
        for (sequence, action) in table {
            keymap.bind_str(sequence, action)?;
        }
        Ok(keymap)
    }

    /// Bind `sequence` to `action`, returning the binding it replaced.
    ///
    /// An empty sequence binds nothing and returns `None`.
    pub fn bind(&mut self, sequence: &ChordSequence, action: A) -> Option<Binding<A>> {
        let (last, prefix) = sequence.as_slice().split_last()?;
        let mut map = self;
        for chord in prefix {
            let entry = map
                .entries
                .entry(*chord)
                .or_insert_with(|| Binding::Prefix(Keymap::new()));
            if let Binding::Action(_) = entry {
                tracing::warn!(
                    keychord = %sequence,
                    prefix = %chord,
                    "binding turns an existing action into a prefix"
                );
                *entry = Binding::Prefix(Keymap::new());
            }
            map = match entry {
                Binding::Prefix(sub) => sub,
                Binding::Action(_) => unreachable!("action entries were replaced above"),
            };
        }

        let previous = map.entries.insert(*last, Binding::Action(action));
        match &previous {
            Some(Binding::Action(_)) => {
                tracing::warn!(keychord = %sequence, "rebinding clobbers an existing binding");
            }
            Some(Binding::Prefix(sub)) => {
                tracing::warn!(
                    keychord = %sequence,
                    shadowed = sub.len(),
                    "rebinding replaces a prefix keymap"
                );
            }
            None => {}
        }
        previous
    }

    /// Parse `sequence` and bind it.
    pub fn bind_str(
        &mut self,
        sequence: &str,
        action: A,
    ) -> Result<Option<Binding<A>>, ChordParseError> {
        let sequence: ChordSequence = sequence.parse()?;
        Ok(self.bind(&sequence, action))
    }

    /// Remove the action bound to exactly `sequence`.
    ///
    /// Prefix maps left empty by the removal are pruned.
    pub fn unbind(&mut self, sequence: &[Chord]) -> Option<A> {
        let (first, rest) = sequence.split_first()?;
        if rest.is_empty() {
            return match self.entries.remove(first)? {
                Binding::Action(action) => Some(action),
                prefix @ Binding::Prefix(_) => {
                    self.entries.insert(*first, prefix);
                    None
                }
            };
        }
        let Binding::Prefix(sub) = self.entries.get_mut(first)? else {
            return None;
        };
        let removed = sub.unbind(rest);
        if sub.is_empty() {
            self.entries.remove(first);
        }
        removed
    }

    /// Copy every binding from `other` that this keymap does not define.
    ///
    /// Existing actions are kept; nested prefixes on both sides are merged
    /// recursively. An action on one side and a prefix on the other keeps
    /// this side's entry.
    pub fn merge_from(&mut self, other: &Keymap<A>) {
        for (chord, theirs) in &other.entries {
            match (self.entries.get_mut(chord), theirs) {
                (None, _) => {
                    self.entries.insert(*chord, theirs.clone());
                }
                (Some(Binding::Prefix(mine)), Binding::Prefix(theirs)) => mine.merge_from(theirs),
                (Some(_), _) => {}
            }
        }
    }

    /// Compose an own table with capability keymaps in precedence order.
    pub fn composed<'k>(own: &Keymap<A>, supers: impl IntoIterator<Item = &'k Keymap<A>>) -> Self
    where
        A: 'k,
    {
        let mut merged = own.clone();
        for parent in supers {
            merged.merge_from(parent);
        }
        merged
    }
}

impl<A> Keymap<A> {
    /// Resolve a chord sequence.
    ///
    /// An empty sequence is a (trivial) prefix of everything and yields
    /// [`Lookup::Pending`].
    pub fn lookup(&self, sequence: &[Chord]) -> Lookup<'_, A> {
        let mut map = self;
        for (i, chord) in sequence.iter().enumerate() {
            match map.entries.get(chord) {
                None => return Lookup::NoMatch,
                Some(Binding::Action(action)) => {
                    return if i + 1 == sequence.len() {
                        Lookup::Matched(action)
                    } else {
                        Lookup::NoMatch
                    };
                }
                Some(Binding::Prefix(sub)) => map = sub,
            }
        }
        Lookup::Pending
    }

    /// Number of actions reachable from this map.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .map(|binding| match binding {
                Binding::Action(_) => 1,
                Binding::Prefix(sub) => sub.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All bound sequences with their actions, in chord order.
    pub fn bindings(&self) -> Vec<(ChordSequence, &A)> {
        let mut out = Vec::new();
        self.collect_bindings(&mut Vec::new(), &mut out);
        out
    }

    fn collect_bindings<'a>(&'a self, path: &mut Vec<Chord>, out: &mut Vec<(ChordSequence, &'a A)>) {
        for (chord, binding) in &self.entries {
            path.push(*chord);
            match binding {
                Binding::Action(action) => out.push((ChordSequence::from(path.clone()), action)),
                Binding::Prefix(sub) => sub.collect_bindings(path, out),
            }
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    fn seq(s: &str) -> ChordSequence {
        s.parse().expect("valid sequence")
    }

    fn keymap(rows: &[(&str, &'static str)]) -> Keymap<&'static str> {
        Keymap::from_table(rows.iter().copied()).expect("valid table")
    }

    // Captures warning messages emitted while a closure runs.
    struct WarnCapture(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor<'a>(&'a mut String);

    impl tracing::field::Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                *self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                let mut message = String::new();
                event.record(&mut MessageVisitor(&mut message));
                self.0.lock().unwrap().push(message);
            }
        }
    }

    fn warnings_during(f: impl FnOnce()) -> Vec<String> {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(WarnCapture(captured.clone()));
        tracing::subscriber::with_default(subscriber, f);
        let out = captured.lock().unwrap().clone();
        out
    }

    #[test]
    fn pending_unknown_and_matched() {
        let km = keymap(&[("C-x 2", "split-below")]);
        assert_eq!(km.lookup(seq("C-x").as_slice()), Lookup::Pending);
        assert_eq!(km.lookup(seq("C-x 3").as_slice()), Lookup::NoMatch);
        assert_eq!(
            km.lookup(seq("C-x 2").as_slice()),
            Lookup::Matched(&"split-below")
        );
    }

    #[test]
    fn overlong_sequence_is_no_match() {
        let km = keymap(&[("M-n", "next")]);
        assert_eq!(km.lookup(seq("M-n x").as_slice()), Lookup::NoMatch);
    }

    #[test]
    fn empty_sequence_is_pending() {
        let km = keymap(&[("a", "a")]);
        assert_eq!(km.lookup(&[]), Lookup::Pending);
    }

    #[test]
    fn rebinding_warns_and_replaces() {
        let mut km = keymap(&[("C-x 0", "old")]);
        let warnings = warnings_during(|| {
            let previous = km.bind(&seq("C-x 0"), "new");
            assert_eq!(previous, Some(Binding::Action("old")));
        });
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("clobbers"));
        assert_eq!(km.lookup(seq("C-x 0").as_slice()), Lookup::Matched(&"new"));
    }

    #[test]
    fn fresh_binding_does_not_warn() {
        let mut km = keymap(&[("C-x 0", "zero")]);
        let warnings = warnings_during(|| {
            assert!(km.bind(&seq("C-x 1"), "one").is_none());
        });
        assert!(warnings.is_empty());
    }

    #[test]
    fn action_becomes_prefix_with_warning() {
        let mut km = keymap(&[("C-c", "copy")]);
        let warnings = warnings_during(|| {
            km.bind(&seq("C-c C-c"), "commit");
        });
        assert_eq!(warnings.len(), 1);
        assert_eq!(km.lookup(seq("C-c").as_slice()), Lookup::Pending);
    }

    #[test]
    fn merge_first_definition_wins() {
        let mut own = keymap(&[("<enter>", "own-enter")]);
        let list = keymap(&[("<enter>", "list-enter"), ("<down>", "list-down")]);
        own.merge_from(&list);
        assert_eq!(
            own.lookup(seq("<enter>").as_slice()),
            Lookup::Matched(&"own-enter")
        );
        assert_eq!(
            own.lookup(seq("<down>").as_slice()),
            Lookup::Matched(&"list-down")
        );
    }

    #[test]
    fn merge_recurses_into_prefixes() {
        let mut own = keymap(&[("C-x a", "own-a")]);
        let other = keymap(&[("C-x a", "other-a"), ("C-x b", "other-b")]);
        own.merge_from(&other);
        assert_eq!(own.lookup(seq("C-x a").as_slice()), Lookup::Matched(&"own-a"));
        assert_eq!(own.lookup(seq("C-x b").as_slice()), Lookup::Matched(&"other-b"));
    }

    #[test]
    fn composed_respects_super_order() {
        let own = keymap(&[]);
        let first = keymap(&[("<up>", "first-up")]);
        let second = keymap(&[("<up>", "second-up"), ("<down>", "second-down")]);
        let merged = Keymap::composed(&own, [&first, &second]);
        assert_eq!(merged.lookup(seq("<up>").as_slice()), Lookup::Matched(&"first-up"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn unbind_prunes_empty_prefixes() {
        let mut km = keymap(&[("C-x 5 2", "new-set")]);
        assert_eq!(km.unbind(seq("C-x 5 2").as_slice()), Some("new-set"));
        assert!(km.is_empty());
        assert_eq!(km.unbind(seq("C-x").as_slice()), None);
    }

    #[test]
    fn bindings_lists_full_sequences() {
        let km = keymap(&[("C-x 2", "two"), ("M-n", "next")]);
        let listed: Vec<String> = km
            .bindings()
            .into_iter()
            .map(|(s, a)| format!("{s}={a}"))
            .collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&"C-x 2=two".to_string()));
        assert!(listed.contains(&"M-n=next".to_string()));
    }

    #[test]
    fn from_table_rejects_bad_chords() {
        let err = Keymap::from_table([("C-x <nope>", "x")]).unwrap_err();
        assert_eq!(err, ChordParseError::UnknownKeyName("nope".into()));
    }
}
