use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Integer pixel box in image coordinates; `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

impl BBox {
    pub fn new(x0: usize, y0: usize, width: usize, height: usize) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    /// Builds a box from inclusive corner coordinates.
    pub fn from_corners(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        let (lo_x, hi_x) = (x0.min(x1), x0.max(x1));
        let (lo_y, hi_y) = (y0.min(y1), y0.max(y1));
        Self::new(lo_x, lo_y, hi_x - lo_x + 1, hi_y - lo_y + 1)
    }

    pub fn with_dims(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Inclusive maximum column.
    pub fn x1(&self) -> usize {
        (self.x0 + self.width).saturating_sub(1)
    }

    /// Inclusive maximum row.
    pub fn y1(&self) -> usize {
        (self.y0 + self.height).saturating_sub(1)
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn rows(&self) -> Range<usize> {
        self.y0..self.y0 + self.height
    }

    pub fn cols(&self) -> Range<usize> {
        self.x0..self.x0 + self.width
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.cols().contains(&x) && self.rows().contains(&y)
    }

    pub fn contains_box(&self, other: &BBox) -> bool {
        other.is_empty()
            || (other.x0 >= self.x0
                && other.y0 >= self.y0
                && other.x0 + other.width <= self.x0 + self.width
                && other.y0 + other.height <= self.y0 + self.height)
    }

    /// Grows the box by `n` pixels on every side, clipped to `bounds`.
    pub fn grown(&self, n: usize, bounds: &BBox) -> BBox {
        let x0 = self.x0.saturating_sub(n).max(bounds.x0);
        let y0 = self.y0.saturating_sub(n).max(bounds.y0);
        let x_end = (self.x0 + self.width + n).min(bounds.x0 + bounds.width);
        let y_end = (self.y0 + self.height + n).min(bounds.y0 + bounds.height);
        BBox::new(x0, y0, x_end.saturating_sub(x0), y_end.saturating_sub(y0))
    }

    /// Expresses this box relative to `origin`'s corner. Fails when it starts before `origin`.
    pub fn relative_to(&self, origin: &BBox) -> Option<BBox> {
        let x0 = self.x0.checked_sub(origin.x0)?;
        let y0 = self.y0.checked_sub(origin.y0)?;
        Some(BBox::new(x0, y0, self.width, self.height))
    }

    pub fn shifted(&self, dx: usize, dy: usize) -> BBox {
        BBox::new(self.x0 + dx, self.y0 + dy, self.width, self.height)
    }

    /// Swaps the roles of rows and columns.
    pub fn transposed(&self) -> BBox {
        BBox::new(self.y0, self.x0, self.height, self.width)
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}]",
            self.x0,
            self.x1(),
            self.y0,
            self.y1()
        )
    }
}
