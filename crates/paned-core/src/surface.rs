#![forbid(unsafe_code)]

//! The screen-surface contract.
//!
//! The layout engine never writes escape sequences. It asks a
//! [`ScreenSurface`] for sub-regions, keeps them sized to its windows, and
//! renders text and symbols into them with region-relative coordinates.
//!
//! [`HeadlessSurface`] is an in-memory implementation that records a character
//! grid. It backs tests and any host that renders elsewhere.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::rc::Rc;

use bitflags::bitflags;

use crate::geometry::Rect;

/// Handle to a sub-region created by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl RegionId {
    /// The whole screen. Always valid; never released.
    pub const ROOT: RegionId = RegionId(0);
}

/// A terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default.
    #[default]
    Default,
    /// One of the 256 indexed colors.
    Indexed(u8),
    Rgb(u8, u8, u8),
}

bitflags! {
    /// Text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attributes: u8 {
        const BOLD      = 0b0001;
        const UNDERLINE = 0b0010;
        const REVERSE   = 0b0100;
        const DIM       = 0b1000;
    }
}

/// Foreground, background and attributes for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attributes,
}

impl Style {
    pub const fn new() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attributes::empty(),
        }
    }

    #[must_use]
    pub const fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    #[must_use]
    pub const fn bg(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    #[must_use]
    pub const fn attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = self.attrs.union(attrs);
        self
    }

    /// Mode line of the selected window.
    pub const MODELINE_ACTIVE: Style = Style::new().attrs(Attributes::REVERSE.union(Attributes::BOLD));
    /// Mode line of every other window.
    pub const MODELINE_INACTIVE: Style = Style::new().attrs(Attributes::REVERSE);
    /// Vertical window dividers.
    pub const DIVIDER: Style = Style::new().attrs(Attributes::DIM);
    /// Highlighted list item.
    pub const SELECTION: Style = Style::new().attrs(Attributes::REVERSE);
}

/// Line-drawing symbols a surface knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    VLine,
    HLine,
}

impl Symbol {
    /// Fallback character for surfaces without line drawing.
    pub const fn as_char(self) -> char {
        match self {
            Self::VLine => '│',
            Self::HLine => '─',
        }
    }
}

/// Rendering backend consumed by the layout engine.
pub trait ScreenSurface {
    /// Current screen size as `(rows, cols)`.
    fn dimensions(&self) -> (u16, u16);

    /// Create a sub-region covering `rect`.
    fn create_region(&mut self, rect: Rect) -> RegionId;

    /// Move or resize an existing sub-region.
    fn resize_region(&mut self, region: RegionId, rect: Rect);

    /// Forget a sub-region whose window has been deleted.
    fn release_region(&mut self, region: RegionId);

    /// Blank every cell of a region.
    fn clear_region(&mut self, region: RegionId);

    /// Draw text at a region-relative position. Text past the region's right
    /// edge is clipped.
    fn render_text(&mut self, region: RegionId, row: u16, col: u16, text: &str, style: Style);

    /// Draw one symbol at a region-relative position.
    fn render_symbol(&mut self, region: RegionId, row: u16, col: u16, symbol: Symbol, style: Style);

    /// Push pending output to the screen.
    fn flush(&mut self) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// Headless surface
// ---------------------------------------------------------------------------

/// In-memory surface recording a character grid.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    rows: u16,
    cols: u16,
    regions: BTreeMap<RegionId, Rect>,
    next_region: u32,
    cells: Vec<Vec<(char, Style)>>,
    flushes: usize,
}

impl HeadlessSurface {
    /// A blank screen of `rows` x `cols` cells.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            regions: BTreeMap::new(),
            next_region: 1,
            cells: blank(rows, cols),
            flushes: 0,
        }
    }

    /// Simulate a terminal resize. Callers deliver the resize event.
    pub fn set_dimensions(&mut self, rows: u16, cols: u16) {
        self.rows = rows;
        self.cols = cols;
        self.cells = blank(rows, cols);
    }

    /// The rectangle currently assigned to a region.
    pub fn region(&self, region: RegionId) -> Option<Rect> {
        if region == RegionId::ROOT {
            return Some(Rect::from_size(self.cols, self.rows));
        }
        self.regions.get(&region).copied()
    }

    /// Number of live sub-regions (excluding the root).
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Text of one screen row, with trailing blanks trimmed.
    pub fn row_text(&self, row: u16) -> String {
        self.cells
            .get(usize::from(row))
            .map(|cells| cells.iter().map(|(c, _)| *c).collect::<String>())
            .unwrap_or_default()
            .trim_end()
            .to_string()
    }

    /// Style of one cell.
    pub fn style_at(&self, row: u16, col: u16) -> Option<Style> {
        self.cells
            .get(usize::from(row))?
            .get(usize::from(col))
            .map(|(_, style)| *style)
    }

    /// Whole screen as text, one line per row.
    pub fn screen_text(&self) -> String {
        (0..self.rows)
            .map(|row| self.row_text(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// How many times [`ScreenSurface::flush`] ran.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn put(&mut self, region: RegionId, row: u16, col: u16, c: char, style: Style) -> bool {
        let Some(rect) = self.region(region) else {
            return false;
        };
        if row >= rect.height || col >= rect.width {
            return false;
        }
        let (y, x) = (usize::from(rect.y + row), usize::from(rect.x + col));
        match self.cells.get_mut(y).and_then(|cells| cells.get_mut(x)) {
            Some(cell) => {
                *cell = (c, style);
                true
            }
            None => false,
        }
    }
}

fn blank(rows: u16, cols: u16) -> Vec<Vec<(char, Style)>> {
    vec![vec![(' ', Style::new()); usize::from(cols)]; usize::from(rows)]
}

impl ScreenSurface for HeadlessSurface {
    fn dimensions(&self) -> (u16, u16) {
        (self.rows, self.cols)
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
        let Some(rect) = self.region(region) else {
            return;
        };
        for row in 0..rect.height {
            for col in 0..rect.width {
                self.put(region, row, col, ' ', Style::new());
            }
        }
    }

    fn render_text(&mut self, region: RegionId, row: u16, col: u16, text: &str, style: Style) {
        let mut col = col;
        for c in text.chars() {
            if !self.put(region, row, col, c, style) {
                break;
            }
            col = col.saturating_add(1);
        }
    }

    fn render_symbol(&mut self, region: RegionId, row: u16, col: u16, symbol: Symbol, style: Style) {
        self.put(region, row, col, symbol.as_char(), style);
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

// A surface shared with the host, e.g. a test that inspects the grid while
// the engine owns the other handle.
impl<S: ScreenSurface + ?Sized> ScreenSurface for Rc<RefCell<S>> {
    fn dimensions(&self) -> (u16, u16) {
        self.borrow().dimensions()
    }

    fn create_region(&mut self, rect: Rect) -> RegionId {
        self.borrow_mut().create_region(rect)
    }

    fn resize_region(&mut self, region: RegionId, rect: Rect) {
        self.borrow_mut().resize_region(region, rect);
    }

    fn release_region(&mut self, region: RegionId) {
        self.borrow_mut().release_region(region);
    }

    fn clear_region(&mut self, region: RegionId) {
        self.borrow_mut().clear_region(region);
    }

    fn render_text(&mut self, region: RegionId, row: u16, col: u16, text: &str, style: Style) {
        self.borrow_mut().render_text(region, row, col, text, style);
    }

    fn render_symbol(&mut self, region: RegionId, row: u16, col: u16, symbol: Symbol, style: Style) {
        self.borrow_mut().render_symbol(region, row, col, symbol, style);
    }

    fn flush(&mut self) -> io::Result<()> {
        self.borrow_mut().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_relative_and_clipped() {
        let mut surface = HeadlessSurface::new(4, 10);
        let region = surface.create_region(Rect::new(2, 1, 5, 2));
        surface.render_text(region, 0, 1, "abcdefgh", Style::new());
        assert_eq!(surface.row_text(1), "   abcd");
        surface.render_text(region, 2, 0, "out of region", Style::new());
        assert_eq!(surface.row_text(3), "");
    }

    #[test]
    fn resize_and_release() {
        let mut surface = HeadlessSurface::new(4, 10);
        let region = surface.create_region(Rect::new(0, 0, 5, 2));
        surface.resize_region(region, Rect::new(0, 2, 10, 2));
        assert_eq!(surface.region(region), Some(Rect::new(0, 2, 10, 2)));
        surface.release_region(region);
        assert_eq!(surface.region(region), None);
        assert_eq!(surface.region_count(), 0);
    }

    #[test]
    fn clear_region_only_touches_region() {
        let mut surface = HeadlessSurface::new(2, 6);
        surface.render_text(RegionId::ROOT, 0, 0, "xxxxxx", Style::new());
        let region = surface.create_region(Rect::new(1, 0, 2, 1));
        surface.clear_region(region);
        assert_eq!(surface.row_text(0), "x  xxx");
    }

    #[test]
    fn symbols_and_styles_are_recorded() {
        let mut surface = HeadlessSurface::new(2, 3);
        surface.render_symbol(RegionId::ROOT, 1, 1, Symbol::VLine, Style::DIVIDER);
        assert_eq!(surface.row_text(1), " │");
        assert_eq!(surface.style_at(1, 1), Some(Style::DIVIDER));
    }

    #[test]
    fn flush_is_counted() {
        let mut surface = HeadlessSurface::new(1, 1);
        surface.flush().unwrap();
        surface.flush().unwrap();
        assert_eq!(surface.flush_count(), 2);
    }
}
