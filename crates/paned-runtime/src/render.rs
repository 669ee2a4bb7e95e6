#![forbid(unsafe_code)]

//! Drawing the active window set and the minibuffer line.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use paned_core::surface::{RegionId, ScreenSurface, Style, Symbol};
use paned_core::text::{Line, clip_to_width, expand_tabs};
use unicode_width::UnicodeWidthStr;

use crate::buffer::RenderContext;
use crate::builtin::FIRST_ROW;
use crate::engine::Engine;
use crate::variables::TAB_STOP;

/// What the minibuffer line shows while no read is active.
///
/// `left` is drawn from column 0, `right` is right-aligned. An echo or an
/// active read replaces `left`; `right` is always drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinibufferContent {
    pub left: String,
    pub right: String,
}

/// Computes the minibuffer line; installed with
/// [`Engine::set_minibuffer_content`].
pub type MinibufferContentFn = Rc<dyn Fn(&Engine) -> MinibufferContent>;

/// Draw `line` into one row of `region`, expanding tabs and clipping at
/// `width` cells.
fn draw_line(
    surface: &mut dyn ScreenSurface,
    region: RegionId,
    row: u16,
    line: &Line,
    width: usize,
    tab_stop: usize,
) {
    let mut col = 0usize;
    for span in &line.spans {
        if col >= width {
            break;
        }
        let expanded = expand_tabs(&span.text, col, tab_stop);
        let clipped = clip_to_width(&expanded, width - col);
        if clipped.is_empty() {
            continue;
        }
        let at = u16::try_from(col).unwrap_or(u16::MAX);
        surface.render_text(region, row, at, clipped, span.style);
        col += clipped.width();
    }
}

/// `text` clipped and padded with spaces to exactly `width` cells.
fn padded(text: &str, width: usize) -> String {
    let clipped = clip_to_width(text, width);
    let fill = width.saturating_sub(clipped.width());
    format!("{clipped}{}", " ".repeat(fill))
}

impl Engine {
    /// Draw the screen and flush the surface.
    pub fn render(&mut self) -> io::Result<()> {
        let names = self.buffers.names();
        let default_tab_stop = usize::from(self.config.tab_stop);
        let set = self.windows.active();
        let selected = set.selected_window_id();

        for window in set.windows() {
            let region = window.region();
            let rect = window.rect();
            let width = usize::from(rect.width);
            let rows = window.content_rows();
            let is_selected = window.id() == selected;
            self.surface.clear_region(region);
            let Some(buffer) = self.buffers.get(window.buffer()) else {
                continue;
            };

            let ctx = RenderContext {
                buffer_names: &names,
                session_log: &self.session_log,
                rows,
                selected: is_selected,
            };
            let tab_stop = self
                .variables
                .lookup(Some(window.buffer()), TAB_STOP)
                .and_then(serde_json::Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(default_tab_stop);
            let first = usize::try_from(window.state().get(FIRST_ROW)).unwrap_or(0);
            for (row, line) in (0..rows).zip(buffer.lines(first, window.state(), &ctx)) {
                draw_line(self.surface.as_mut(), region, row, &line, width, tab_stop);
            }

            if rect.height > 0 {
                let style = if is_selected {
                    Style::MODELINE_ACTIVE
                } else {
                    Style::MODELINE_INACTIVE
                };
                let mode_line = padded(&format!("  {}", buffer.name()), width);
                self.surface
                    .render_text(region, rect.height - 1, 0, &mode_line, style);
            }
        }

        for divider in set.dividers() {
            for offset in 0..divider.height {
                self.surface.render_symbol(
                    RegionId::ROOT,
                    divider.y + offset,
                    divider.x,
                    Symbol::VLine,
                    Style::DIVIDER,
                );
            }
        }

        self.render_minibuffer_line();
        self.surface.flush()
    }

    /// Replace what the minibuffer line shows between reads.
    pub fn set_minibuffer_content(
        &mut self,
        content: impl Fn(&Engine) -> MinibufferContent + 'static,
    ) {
        self.minibuffer_content = Some(Rc::new(content));
    }

    /// Go back to the last message and the window-set indicator.
    pub fn reset_minibuffer_content(&mut self) {
        self.minibuffer_content = None;
    }

    pub fn default_minibuffer_content(&self) -> MinibufferContent {
        MinibufferContent {
            left: self
                .last_message()
                .and_then(|message| message.lines().next())
                .unwrap_or_default()
                .to_string(),
            right: format!("{}/{}", self.windows.active_index() + 1, self.windows.len()),
        }
    }

    /// The content the minibuffer line would show now.
    ///
    /// A provider that panics is removed and the default content is used.
    pub fn minibuffer_content(&mut self) -> MinibufferContent {
        let Some(provider) = self.minibuffer_content.clone() else {
            return self.default_minibuffer_content();
        };
        match catch_unwind(AssertUnwindSafe(|| provider(self))) {
            Ok(content) => content,
            Err(_) => {
                tracing::error!("minibuffer content provider panicked; restoring the default");
                self.minibuffer_content = None;
                self.message("Minibuffer content function failed.");
                self.default_minibuffer_content()
            }
        }
    }

    fn render_minibuffer_line(&mut self) {
        let (rows, cols) = self.surface.dimensions();
        let Some(row) = rows.checked_sub(self.config.minibuffer_rows) else {
            return;
        };
        let width = usize::from(cols);
        self.surface
            .render_text(RegionId::ROOT, row, 0, &" ".repeat(width), Style::new());

        let MinibufferContent { left, right: indicator } = self.minibuffer_content();
        let left_width = width.saturating_sub(indicator.width() + 1);

        let reading = self.frames.last().and_then(|frame| frame.minibuffer.as_ref());
        match (&self.echo, reading) {
            (Some(echo), _) => {
                let text = clip_to_width(echo, left_width);
                self.surface
                    .render_text(RegionId::ROOT, row, 0, text, Style::new());
            }
            (None, Some(state)) => {
                let prompt = clip_to_width(state.prompt(), left_width);
                self.surface
                    .render_text(RegionId::ROOT, row, 0, prompt, Style::new());
                let offset = prompt.width();
                let input = state.input();
                let cursor = input.cursor();
                let before: String = input.text().chars().take(cursor).collect();
                let at = input.text().chars().nth(cursor).unwrap_or(' ');
                let after: String = input.text().chars().skip(cursor + 1).collect();
                let line = Line {
                    spans: vec![
                        paned_core::text::Span::raw(before),
                        paned_core::text::Span::styled(at.to_string(), Style::SELECTION),
                        paned_core::text::Span::raw(after),
                    ],
                };
                let at_col = u16::try_from(offset).unwrap_or(u16::MAX);
                draw_line_at(
                    self.surface.as_mut(),
                    row,
                    at_col,
                    &line,
                    left_width.saturating_sub(offset),
                );
            }
            (None, None) => {
                let text = clip_to_width(&left, left_width);
                self.surface
                    .render_text(RegionId::ROOT, row, 0, text, Style::new());
            }
        }

        if !indicator.is_empty() && indicator.width() < width {
            let col = u16::try_from(width - indicator.width()).unwrap_or(0);
            self.surface
                .render_text(RegionId::ROOT, row, col, &indicator, Style::new());
        }
    }
}

/// Like [`draw_line`] on the root region, starting at column `start`.
fn draw_line_at(surface: &mut dyn ScreenSurface, row: u16, start: u16, line: &Line, width: usize) {
    let mut col = 0usize;
    for span in &line.spans {
        let clipped = clip_to_width(&span.text, width.saturating_sub(col));
        if clipped.is_empty() {
            continue;
        }
        let at = start.saturating_add(u16::try_from(col).unwrap_or(u16::MAX));
        surface.render_text(RegionId::ROOT, row, at, clipped, span.style);
        col += clipped.width();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use paned_core::surface::HeadlessSurface;

    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> (Engine, Rc<RefCell<HeadlessSurface>>) {
        let surface = Rc::new(RefCell::new(HeadlessSurface::new(6, 30)));
        let engine = Engine::new(EngineConfig::default(), Rc::clone(&surface)).unwrap();
        (engine, surface)
    }

    #[test]
    fn padded_fills_to_width() {
        assert_eq!(padded("ab", 4), "ab  ");
        assert_eq!(padded("abcdef", 3), "abc");
    }

    #[test]
    fn draws_log_lines_mode_line_and_indicator() {
        let (mut engine, surface) = engine();
        engine.message("hello\tworld");
        engine.render().unwrap();
        let screen = surface.borrow();
        assert_eq!(screen.row_text(0), "hello   world");
        assert_eq!(screen.row_text(4), "  Log");
        assert_eq!(screen.style_at(4, 0), Some(Style::MODELINE_ACTIVE));
        assert!(screen.row_text(5).starts_with("hello"));
        assert!(screen.row_text(5).ends_with("1/1"));
        assert_eq!(screen.flush_count(), 1);
    }

    #[test]
    fn side_by_side_windows_get_a_divider() {
        let (mut engine, surface) = engine();
        engine.split_right().unwrap();
        engine.render().unwrap();
        let screen = surface.borrow();
        let divider = engine.windows().active().dividers()[0];
        assert_eq!(
            screen.row_text(0).chars().nth(usize::from(divider.x)),
            Some(Symbol::VLine.as_char())
        );
        // The new right-hand window is the selected one.
        assert_eq!(screen.style_at(4, 0), Some(Style::MODELINE_INACTIVE));
        let right = usize::from(divider.x) + 1;
        assert_eq!(
            screen.style_at(4, u16::try_from(right).unwrap()),
            Some(Style::MODELINE_ACTIVE)
        );
    }

    #[test]
    fn buffer_tab_stop_overrides_the_default() {
        let (mut engine, surface) = engine();
        engine.message("a\tb");
        let log = engine.current_buffer().unwrap();
        engine.set_buffer_variable(log, TAB_STOP, 8u16).unwrap();
        engine.render().unwrap();
        assert_eq!(surface.borrow().row_text(0), "a       b");
    }

    #[test]
    fn minibuffer_content_can_be_replaced() {
        let (mut engine, surface) = engine();
        engine.set_minibuffer_content(|engine| MinibufferContent {
            left: format!("{} windows", engine.windows().active().windows().count()),
            right: "[paned]".to_string(),
        });
        engine.render().unwrap();
        let row = surface.borrow().row_text(5);
        assert!(row.starts_with("1 windows"));
        assert!(row.ends_with("[paned]"));

        engine.reset_minibuffer_content();
        engine.render().unwrap();
        let row = surface.borrow().row_text(5);
        assert!(!row.contains("windows"));
        assert!(row.ends_with("1/1"));
    }

    #[test]
    fn panicking_minibuffer_content_falls_back_to_the_default() {
        let (mut engine, surface) = engine();
        engine.set_minibuffer_content(|_| panic!("boom"));
        engine.render().unwrap();
        assert_eq!(engine.last_message(), Some("Minibuffer content function failed."));
        assert!(surface.borrow().row_text(5).ends_with("1/1"));
        assert_eq!(engine.minibuffer_content(), engine.default_minibuffer_content());
    }
}
