#![forbid(unsafe_code)]

//! Geometric primitives for window layout.
//!
//! Rectangles use terminal coordinates (0-indexed, origin at top-left). A
//! window's `(rows, cols, row_offset, col_offset)` maps onto
//! `(height, width, y, x)`.

/// A screen rectangle in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    /// Area in cells.
    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Check whether both dimensions meet the given minimum.
    #[inline]
    pub const fn fits(&self, min_height: u16, min_width: u16) -> bool {
        self.height >= min_height && self.width >= min_width
    }

    /// Split into a top and bottom part.
    ///
    /// The top part receives `ceil(height * num / den)` rows, the bottom part
    /// the remainder, so the halves of an even split differ by at most one.
    pub fn split_rows(&self, num: u64, den: u64) -> (Rect, Rect) {
        let first = scaled(self.height, num, den, true);
        let second = self.height - first;
        (
            Rect::new(self.x, self.y, self.width, first),
            Rect::new(self.x, self.y.saturating_add(first), self.width, second),
        )
    }

    /// Split into a left and right part separated by a one-column divider.
    ///
    /// The left part receives `floor(width * num / den)` columns; the divider
    /// occupies the column right after it and the right part gets the rest.
    pub fn split_cols(&self, num: u64, den: u64) -> (Rect, Rect) {
        let first = scaled(self.width, num, den, false);
        let second = self.width.saturating_sub(first).saturating_sub(1);
        (
            Rect::new(self.x, self.y, first, self.height),
            Rect::new(
                self.x.saturating_add(first).saturating_add(1),
                self.y,
                second,
                self.height,
            ),
        )
    }
}

/// `total * num / den`, rounded as asked and clamped to `total`.
fn scaled(total: u16, num: u64, den: u64, round_up: bool) -> u16 {
    let den = u128::from(den.max(1));
    let product = u128::from(total) * u128::from(num);
    let share = if round_up {
        product.div_ceil(den)
    } else {
        product / den
    };
    u16::try_from(share).map_or(total, |share| share.min(total))
}
