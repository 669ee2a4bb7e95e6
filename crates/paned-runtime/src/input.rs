#![forbid(unsafe_code)]

//! Single-line text editing with history, shared by the minibuffer and
//! console buffers.

/// An editable line. The cursor is a character index in `0..=len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInput {
    text: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    saved: String,
}

impl LineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An input pre-filled with `text`, cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut input = Self::new();
        input.set_text(text);
        input
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Replace the text and move the cursor to its end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.char_len();
    }

    pub fn insert(&mut self, text: &str) {
        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    /// Delete the character before the cursor.
    pub fn delete_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.delete_forward()
    }

    /// Delete the character under the cursor.
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.set_cursor(self.cursor.wrapping_sub(1))
    }

    pub fn move_right(&mut self) -> bool {
        self.set_cursor(self.cursor + 1)
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Delete from the cursor to the end of the line.
    pub fn kill_to_end(&mut self) {
        let at = self.byte_offset(self.cursor);
        self.text.truncate(at);
    }

    /// Take the text for submission, recording it in the history.
    pub fn submit(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        self.cursor = 0;
        self.history_index = None;
        if !text.is_empty() && self.history.last() != Some(&text) {
            self.history.push(text.clone());
        }
        text
    }

    /// Step back through the history.
    pub fn history_previous(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.history_index {
            None => {
                self.saved = self.text.clone();
                self.history.len() - 1
            }
            Some(index) => index.saturating_sub(1),
        };
        self.show_history(index);
    }

    /// Step forward through the history, back to the line being edited.
    pub fn history_next(&mut self) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 >= self.history.len() {
            self.history_index = None;
            let saved = std::mem::take(&mut self.saved);
            self.set_text(saved);
        } else {
            self.show_history(index + 1);
        }
    }

    fn show_history(&mut self, index: usize) {
        self.history_index = Some(index);
        if let Some(entry) = self.history.get(index) {
            let entry = entry.clone();
            self.set_text(entry);
        }
    }

    fn set_cursor(&mut self, cursor: usize) -> bool {
        if cursor <= self.char_len() {
            self.cursor = cursor;
            true
        } else {
            false
        }
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(offset, _)| offset)
    }
}

/// Longest common prefix of all candidates, by characters.
pub fn common_prefix<'a>(candidates: impl IntoIterator<Item = &'a str>) -> String {
    let mut iter = candidates.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut prefix: &str = first;
    for candidate in iter {
        let shared = prefix
            .char_indices()
            .zip(candidate.chars())
            .find(|((_, a), b)| a != b)
            .map_or(prefix.len().min(candidate.len()), |((offset, _), _)| offset);
        prefix = &prefix[..shared];
    }
    prefix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete_around_cursor() {
        let mut input = LineInput::with_text("held");
        input.move_left();
        input.move_left();
        input.insert("l");
        assert_eq!(input.text(), "helld");
        assert!(input.delete_backward());
        assert_eq!(input.text(), "held");
        assert!(input.delete_forward());
        assert_eq!(input.text(), "hed");
        assert_eq!(input.cursor(), 2);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = LineInput::with_text("ab");
        assert!(!input.move_right());
        input.move_home();
        assert!(!input.move_left());
        assert!(!input.delete_backward());
        input.move_end();
        assert!(!input.delete_forward());
    }

    #[test]
    fn multibyte_text_is_edited_by_character() {
        let mut input = LineInput::with_text("größe");
        input.move_left();
        input.move_left();
        input.delete_backward();
        assert_eq!(input.text(), "grße");
        input.kill_to_end();
        assert_eq!(input.text(), "gr");
    }

    #[test]
    fn history_walks_and_restores_the_edit() {
        let mut input = LineInput::new();
        input.insert("one");
        input.submit();
        input.insert("two");
        input.submit();
        input.insert("draft");
        input.history_previous();
        assert_eq!(input.text(), "two");
        input.history_previous();
        assert_eq!(input.text(), "one");
        input.history_previous();
        assert_eq!(input.text(), "one");
        input.history_next();
        assert_eq!(input.text(), "two");
        input.history_next();
        assert_eq!(input.text(), "draft");
    }

    #[test]
    fn submit_skips_empty_and_repeated_entries() {
        let mut input = LineInput::new();
        input.submit();
        input.insert("x");
        input.submit();
        input.insert("x");
        assert_eq!(input.submit(), "x");
        assert_eq!(input.history(), ["x".to_string()]);
    }

    #[test]
    fn common_prefix_of_candidates() {
        assert_eq!(common_prefix(["src/main.rs", "src/mod.rs"]), "src/m");
        assert_eq!(common_prefix(["abc"]), "abc");
        assert_eq!(common_prefix(["abc", "ab"]), "ab");
        assert_eq!(common_prefix(["äb", "äc"]), "ä");
        assert_eq!(common_prefix(Vec::<&str>::new()), "");
    }
}
