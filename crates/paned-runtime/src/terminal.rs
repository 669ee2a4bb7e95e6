#![forbid(unsafe_code)]

//! A crossterm-backed screen surface and terminal input source.
//!
//! [`TerminalSurface`] owns the terminal for its lifetime: it enters raw mode
//! and the alternate screen on creation and restores both when dropped, in
//! reverse order. Drawing is queued and written on [`ScreenSurface::flush`];
//! the first write error is kept and reported by the next flush.

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Stdout, Write};
use std::time::Duration;

use crossterm::style::{self as cts, Attribute, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, event, queue, terminal};
use paned_core::event::decode_crossterm;
use paned_core::geometry::Rect;
use paned_core::surface::{Attributes, Color, RegionId, ScreenSurface, Style, Symbol};
use unicode_width::UnicodeWidthChar;

use crate::engine::Engine;
use crate::reactor::WaitableId;

/// Which terminal features to enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalOptions {
    pub alternate_screen: bool,
    pub bracketed_paste: bool,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            alternate_screen: true,
            bracketed_paste: true,
        }
    }
}

/// The controlling terminal as a [`ScreenSurface`].
#[derive(Debug)]
pub struct TerminalSurface {
    out: BufWriter<Stdout>,
    regions: BTreeMap<RegionId, Rect>,
    next_region: u32,
    size: (u16, u16),
    error: Option<io::Error>,
    alternate_screen: bool,
    bracketed_paste: bool,
}

impl TerminalSurface {
    /// Take over the terminal.
    pub fn new(options: TerminalOptions) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        tracing::info!("terminal raw mode enabled");
        let (cols, rows) = terminal::size()?;
        let mut surface = Self {
            out: BufWriter::new(io::stdout()),
            regions: BTreeMap::new(),
            next_region: 1,
            size: (rows, cols),
            error: None,
            alternate_screen: false,
            bracketed_paste: false,
        };
        if options.alternate_screen {
            crossterm::execute!(surface.out, terminal::EnterAlternateScreen)?;
            surface.alternate_screen = true;
        }
        if options.bracketed_paste {
            crossterm::execute!(surface.out, event::EnableBracketedPaste)?;
            surface.bracketed_paste = true;
        }
        crossterm::execute!(surface.out, cursor::Hide, terminal::Clear(terminal::ClearType::All))?;
        Ok(surface)
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }

    /// Absolute screen position of a region-relative cell, if it is inside.
    fn locate(&self, region: RegionId, row: u16, col: u16) -> Option<(Rect, u16, u16)> {
        let rect = if region == RegionId::ROOT {
            Rect::from_size(self.size.1, self.size.0)
        } else {
            *self.regions.get(&region)?
        };
        (row < rect.height && col < rect.width).then_some((rect, rect.x + col, rect.y + row))
    }

    fn queue_styled(&mut self, x: u16, y: u16, text: &str, style: Style) {
        let result = queue!(
            self.out,
            cursor::MoveTo(x, y),
            SetAttribute(Attribute::Reset),
            SetForegroundColor(map_color(style.fg)),
            SetBackgroundColor(map_color(style.bg)),
        )
        .and_then(|()| queue_attributes(&mut self.out, style.attrs))
        .and_then(|()| queue!(self.out, cts::Print(text)));
        self.record(result);
    }

    fn cleanup(&mut self) {
        let _ = queue!(self.out, SetAttribute(Attribute::Reset), cursor::Show);
        if self.bracketed_paste {
            let _ = queue!(self.out, event::DisableBracketedPaste);
            self.bracketed_paste = false;
        }
        if self.alternate_screen {
            let _ = queue!(self.out, terminal::LeaveAlternateScreen);
            self.alternate_screen = false;
        }
        let _ = self.out.flush();
        let _ = terminal::disable_raw_mode();
        tracing::info!("terminal raw mode disabled");
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn map_color(color: Color) -> cts::Color {
    match color {
        Color::Default => cts::Color::Reset,
        Color::Indexed(index) => cts::Color::AnsiValue(index),
        Color::Rgb(r, g, b) => cts::Color::Rgb { r, g, b },
    }
}

fn queue_attributes(out: &mut impl Write, attrs: Attributes) -> io::Result<()> {
    for (flag, attribute) in [
        (Attributes::BOLD, Attribute::Bold),
        (Attributes::UNDERLINE, Attribute::Underlined),
        (Attributes::REVERSE, Attribute::Reverse),
        (Attributes::DIM, Attribute::Dim),
    ] {
        if attrs.contains(flag) {
            queue!(out, SetAttribute(attribute))?;
        }
    }
    Ok(())
}

/// The prefix of `text` that fits in `width` cells.
fn fit(text: &str, width: u16) -> &str {
    let mut used = 0u16;
    for (offset, c) in text.char_indices() {
        let w = u16::try_from(c.width().unwrap_or(0)).unwrap_or(u16::MAX);
        if used.saturating_add(w) > width {
            return &text[..offset];
        }
        used += w;
    }
    text
}

impl ScreenSurface for TerminalSurface {
    fn dimensions(&self) -> (u16, u16) {
        terminal::size().map_or(self.size, |(cols, rows)| (rows, cols))
    }

    fn create_region(&mut self, rect: Rect) -> RegionId {
        let id = RegionId(self.next_region);
        self.next_region += 1;
        self.regions.insert(id, rect);
        id
    }

    fn resize_region(&mut self, region: RegionId, rect: Rect) {
        if let Some(slot) = self.regions.get_mut(&region) {
            *slot = rect;
        }
    }

    fn release_region(&mut self, region: RegionId) {
        self.regions.remove(&region);
    }

    fn clear_region(&mut self, region: RegionId) {
        let Some((rect, x, y)) = self.locate(region, 0, 0) else {
            return;
        };
        let blank = " ".repeat(usize::from(rect.width));
        for row in 0..rect.height {
            self.queue_styled(x, y + row, &blank, Style::new());
        }
    }

    fn render_text(&mut self, region: RegionId, row: u16, col: u16, text: &str, style: Style) {
        let Some((rect, x, y)) = self.locate(region, row, col) else {
            return;
        };
        let visible = fit(text, rect.width - col);
        self.queue_styled(x, y, visible, style);
    }

    fn render_symbol(&mut self, region: RegionId, row: u16, col: u16, symbol: Symbol, style: Style) {
        let Some((_, x, y)) = self.locate(region, row, col) else {
            return;
        };
        let mut buf = [0u8; 4];
        self.queue_styled(x, y, symbol.as_char().encode_utf8(&mut buf), style);
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.size = self.dimensions();
        self.out.flush()
    }
}

impl Engine {
    /// Feed terminal key and resize events into the run loop.
    ///
    /// Stdin is registered with the reactor; each readiness drains every
    /// event crossterm has buffered and queues the decoded input.
    pub fn attach_terminal_input(&mut self) -> WaitableId {
        self.register_waitable(io::stdin(), |engine: &mut Engine, _| {
            while event::poll(Duration::ZERO)? {
                let raw = event::read()?;
                if let event::Event::Resize(cols, rows) = raw {
                    tracing::debug!(rows, cols, "terminal resized");
                }
                for input in decode_crossterm(&raw) {
                    engine.push_input(input);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_respects_wide_characters() {
        assert_eq!(fit("hello", 3), "hel");
        assert_eq!(fit("日本語", 5), "日本");
        assert_eq!(fit("ab", 10), "ab");
    }

    #[test]
    fn colors_map_to_crossterm() {
        assert_eq!(map_color(Color::Default), cts::Color::Reset);
        assert_eq!(map_color(Color::Indexed(3)), cts::Color::AnsiValue(3));
        assert_eq!(map_color(Color::Rgb(1, 2, 3)), cts::Color::Rgb { r: 1, g: 2, b: 3 });
    }

    #[test]
    fn attributes_queue_escape_sequences() {
        let mut out = Vec::new();
        queue_attributes(&mut out, Attributes::BOLD | Attributes::REVERSE).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\u{1b}[1m"));
        assert!(text.contains("\u{1b}[7m"));
    }
}
