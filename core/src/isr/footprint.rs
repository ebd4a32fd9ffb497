use crate::image::geom::BBox;
use crate::image::mask::MaskPixel;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// Run of pixels `x0..=x1` on row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub y: usize,
    pub x0: usize,
    pub x1: usize,
}

impl Span {
    pub fn npix(&self) -> usize {
        self.x1 - self.x0 + 1
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.y, self.npix(), 1)
    }
}

/// Connected set of pixels, kept as spans sorted by row then column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    spans: Vec<Span>,
}

impl Footprint {
    fn from_pixels(mut pixels: Vec<(usize, usize)>) -> Self {
        pixels.sort_unstable();
        let mut spans: Vec<Span> = Vec::new();
        for (y, x) in pixels {
            match spans.last_mut() {
                Some(span) if span.y == y && span.x1 + 1 == x => span.x1 = x,
                _ => spans.push(Span { y, x0: x, x1: x }),
            }
        }
        Self { spans }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn npix(&self) -> usize {
        self.spans.iter().map(Span::npix).sum()
    }

    pub fn bbox(&self) -> BBox {
        let Some(first) = self.spans.first() else {
            return BBox::default();
        };
        let x0 = self.spans.iter().map(|s| s.x0).min().unwrap_or(first.x0);
        let x1 = self.spans.iter().map(|s| s.x1).max().unwrap_or(first.x1);
        let y1 = self.spans.last().map_or(first.y, |s| s.y);
        BBox::from_corners(x0, first.y, x1, y1)
    }

    /// `(x, y)` of every pixel.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.spans
            .iter()
            .flat_map(|span| (span.x0..=span.x1).map(move |x| (x, span.y)))
    }

    /// Grows by `n` pixels in Manhattan distance, clipped to a `width` x `height` image.
    pub fn grown(&self, n: usize, width: usize, height: usize) -> Footprint {
        if n == 0 || self.spans.is_empty() {
            return self.clone();
        }
        let region = self.bbox().grown(n, &BBox::with_dims(width, height));
        let mut bitmap = Array2::from_elem((region.height, region.width), false);
        let n = n as isize;
        for (x, y) in self.pixels() {
            for dy in -n..=n {
                let reach = n - dy.abs();
                for dx in -reach..=reach {
                    let gx = x as isize + dx;
                    let gy = y as isize + dy;
                    if gx < region.x0 as isize
                        || gy < region.y0 as isize
                        || gx >= (region.x0 + region.width) as isize
                        || gy >= (region.y0 + region.height) as isize
                    {
                        continue;
                    }
                    bitmap[[gy as usize - region.y0, gx as usize - region.x0]] = true;
                }
            }
        }
        let pixels = bitmap
            .indexed_iter()
            .filter(|(_, set)| **set)
            .map(|((y, x), _)| (y + region.y0, x + region.x0))
            .collect();
        Footprint::from_pixels(pixels)
    }

    /// One box per span.
    pub fn to_bboxes(&self) -> Vec<BBox> {
        self.spans.iter().map(Span::bbox).collect()
    }

    pub fn set_mask(&self, mask: &mut ArrayViewMut2<'_, MaskPixel>, bits: MaskPixel) {
        for (x, y) in self.pixels() {
            mask[[y, x]] |= bits;
        }
    }
}

/// Footprints of pixels whose value satisfies `predicate`, 8-connected.
pub fn find_footprints<F>(image: ArrayView2<'_, f32>, predicate: F) -> Vec<Footprint>
where
    F: Fn(f32) -> bool,
{
    footprints_from_bitmap(&image.mapv(predicate))
}

/// Footprints of pixels carrying any of `bits`, 8-connected.
pub fn find_mask_footprints(mask: ArrayView2<'_, MaskPixel>, bits: MaskPixel) -> Vec<Footprint> {
    footprints_from_bitmap(&mask.mapv(|m| m & bits != 0))
}

fn footprints_from_bitmap(bitmap: &Array2<bool>) -> Vec<Footprint> {
    let (height, width) = bitmap.dim();
    let mut visited = Array2::from_elem((height, width), false);
    let mut footprints = Vec::new();

    for ((y, x), &set) in bitmap.indexed_iter() {
        if !set || visited[[y, x]] {
            continue;
        }
        visited[[y, x]] = true;
        let mut stack = vec![(y, x)];
        let mut pixels = Vec::new();
        while let Some((cy, cx)) = stack.pop() {
            pixels.push((cy, cx));
            for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
                for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
                    if bitmap[[ny, nx]] && !visited[[ny, nx]] {
                        visited[[ny, nx]] = true;
                        stack.push((ny, nx));
                    }
                }
            }
        }
        footprints.push(Footprint::from_pixels(pixels));
    }
    footprints
}
