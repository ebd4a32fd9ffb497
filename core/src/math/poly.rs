use nalgebra::{DMatrix, DVector};

/// Least-squares polynomial in a coordinate rescaled to `[-1, 1]` over the fitted range.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
    center: f64,
    half_range: f64,
}

impl Polynomial {
    /// Fits `ys` against `xs` with the given order, lowering the order when there are too few points.
    pub fn fit(xs: &[f64], ys: &[f64], order: usize) -> Option<Self> {
        if xs.len() != ys.len() || xs.is_empty() {
            return None;
        }
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let center = (lo + hi) / 2.0;
        let half_range = if hi > lo { (hi - lo) / 2.0 } else { 1.0 };
        let terms = (order + 1).min(xs.len());

        // Vandermonde system in the rescaled coordinate, solved by SVD.
        let a = DMatrix::from_fn(xs.len(), terms, |i, p| {
            ((xs[i] - center) / half_range).powi(p as i32)
        });
        let b = DVector::from_column_slice(ys);
        let coeffs = a.svd(true, true).solve(&b, 1.0e-12).ok()?;
        if coeffs.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let coeffs = coeffs.iter().copied().collect();
        Some(Self {
            coeffs,
            center,
            half_range,
        })
    }

    pub fn order(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.half_range;
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }
}
