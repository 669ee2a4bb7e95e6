#![forbid(unsafe_code)]

//! Styled lines produced by buffers.

use unicode_width::UnicodeWidthChar;

use crate::surface::Style;

/// A run of text in one style.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Style::new(),
        }
    }

    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One display line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::raw(text)],
        }
    }

    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            spans: vec![Span::styled(text, style)],
        }
    }

    /// Concatenated text of all spans.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Self::raw(text)
    }
}

impl From<String> for Line {
    fn from(text: String) -> Self {
        Self::raw(text)
    }
}

/// Replace tabs with spaces up to the next multiple of `tab_stop`.
///
/// `start_col` is the display column the text begins at.
pub fn expand_tabs(text: &str, start_col: usize, tab_stop: usize) -> String {
    let tab_stop = tab_stop.max(1);
    let mut out = String::with_capacity(text.len());
    let mut col = start_col;
    for c in text.chars() {
        if c == '\t' {
            let pad = tab_stop - col % tab_stop;
            out.extend(std::iter::repeat_n(' ', pad));
            col += pad;
        } else {
            out.push(c);
            col += c.width().unwrap_or(0);
        }
    }
    out
}

/// Longest prefix of `text` whose display width fits in `width` columns.
pub fn clip_to_width(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (i, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            return &text[..i];
        }
        used += w;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_expand_to_stops() {
        assert_eq!(expand_tabs("a\tb", 0, 4), "a   b");
        assert_eq!(expand_tabs("\t", 2, 4), "  ");
        assert_eq!(expand_tabs("abcd\te", 0, 4), "abcd    e");
    }

    #[test]
    fn clip_respects_wide_chars() {
        assert_eq!(clip_to_width("hello", 3), "hel");
        assert_eq!(clip_to_width("日本", 3), "日");
        assert_eq!(clip_to_width("ok", 10), "ok");
    }

    #[test]
    fn plain_text_joins_spans() {
        let line = Line {
            spans: vec![Span::raw("ab"), Span::styled("cd", Style::SELECTION)],
        };
        assert_eq!(line.plain_text(), "abcd");
    }
}
