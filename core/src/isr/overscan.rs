use crate::image::geom::BBox;
use crate::image::masked_image::MaskedImageViewMut;
use crate::math::poly::Polynomial;
use crate::math::stats::StatsHelper;
use crate::prelude::{IsrError, IsrResult};
use ndarray::{s, Axis};
use serde::{Deserialize, Serialize};

/// How the bias level is estimated from the overscan region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverscanFitType {
    /// Polynomial along the longest axis of the overscan region.
    Poly,
    Mean,
    Median,
}

/// Subtracts the overscan bias level from every pixel of `amp`.
///
/// `overscan` is expressed in the view's local coordinates and must share the amp's rows
/// (tall overscan) or columns (wide overscan) for the polynomial fit.
pub fn overscan_correction(
    amp: &mut MaskedImageViewMut<'_>,
    overscan: &BBox,
    fit_type: OverscanFitType,
    poly_order: usize,
) -> IsrResult<()> {
    if overscan.is_empty() {
        return Err(IsrError::InvalidInput("overscan region is empty".into()));
    }
    if !amp.bbox().contains_box(overscan) {
        return Err(IsrError::OutOfBounds(overscan.to_string()));
    }
    let region = amp
        .image
        .slice(s![overscan.rows(), overscan.cols()])
        .to_owned();

    match fit_type {
        OverscanFitType::Mean | OverscanFitType::Median => {
            let pixels = region.iter().copied();
            let level = if fit_type == OverscanFitType::Mean {
                StatsHelper::mean(pixels)
            } else {
                StatsHelper::median(pixels)
            }
            .ok_or_else(|| IsrError::InvalidInput("overscan has no finite pixels".into()))?;
            amp.image.mapv_inplace(|v| v - level as f32);
        }
        OverscanFitType::Poly => {
            // Tall overscan strips are fitted against row, wide ones against column.
            let (axis, offset) = if overscan.height >= overscan.width {
                (Axis(0), overscan.y0)
            } else {
                (Axis(1), overscan.x0)
            };
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for (i, lane) in region.axis_iter(axis).enumerate() {
                if let Some(level) = StatsHelper::mean(lane.iter().copied()) {
                    xs.push((offset + i) as f64);
                    ys.push(level);
                }
            }
            let poly = Polynomial::fit(&xs, &ys, poly_order).ok_or_else(|| {
                IsrError::InvalidInput("overscan polynomial fit failed".into())
            })?;
            for (i, mut lane) in amp.image.axis_iter_mut(axis).enumerate() {
                let level = poly.eval(i as f64) as f32;
                lane.mapv_inplace(|v| v - level);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::masked_image::MaskedImage;

    fn constant_with_overscan(width: usize, height: usize, overscan: &BBox) -> MaskedImage {
        let mut mi = MaskedImage::new(width, height);
        mi.set(10.0, 0, 1.0);
        mi.view_mut(overscan).unwrap().image.fill(2.0);
        mi
    }

    #[test]
    fn median_correction_along_rows() {
        let overscan = BBox::from_corners(0, 10, 9, 12);
        let mut mi = constant_with_overscan(10, 13, &overscan);
        overscan_correction(&mut mi.full_view_mut(), &overscan, OverscanFitType::Median, 1)
            .unwrap();
        for ((y, _), &v) in mi.image().indexed_iter() {
            assert_eq!(v, if y >= 10 { 0.0 } else { 8.0 });
        }
    }

    #[test]
    fn mean_correction_along_columns() {
        let overscan = BBox::from_corners(10, 0, 12, 9);
        let mut mi = constant_with_overscan(13, 10, &overscan);
        overscan_correction(&mut mi.full_view_mut(), &overscan, OverscanFitType::Mean, 1).unwrap();
        for ((_, x), &v) in mi.image().indexed_iter() {
            assert_eq!(v, if x >= 10 { 0.0 } else { 8.0 });
        }
    }

    #[test]
    fn poly_correction_tracks_a_row_gradient() {
        let overscan = BBox::from_corners(10, 0, 12, 9);
        let mut mi = constant_with_overscan(13, 10, &overscan);
        for y in 0..10 {
            for (j, off) in [-0.5_f32, 0.0, 0.5].iter().enumerate() {
                mi.image_mut()[[y, 10 + j]] = 2.0 + y as f32 + off;
            }
        }
        overscan_correction(&mut mi.full_view_mut(), &overscan, OverscanFitType::Poly, 1).unwrap();
        for ((y, x), &v) in mi.image().indexed_iter() {
            let expected = match x {
                10 => -0.5,
                11 => 0.0,
                12 => 0.5,
                _ => 8.0 - y as f32,
            };
            assert!((v - expected).abs() < 1e-4, "({x}, {y}): {v} != {expected}");
        }
    }

    #[test]
    fn poly_correction_tracks_a_column_gradient() {
        let overscan = BBox::from_corners(0, 10, 9, 12);
        let mut mi = constant_with_overscan(10, 13, &overscan);
        for x in 0..10 {
            for (j, off) in [-0.5_f32, 0.0, 0.5].iter().enumerate() {
                mi.image_mut()[[10 + j, x]] = 2.0 + x as f32 + off;
            }
        }
        overscan_correction(&mut mi.full_view_mut(), &overscan, OverscanFitType::Poly, 1).unwrap();
        for ((y, x), &v) in mi.image().indexed_iter() {
            let expected = match y {
                10 => -0.5,
                11 => 0.0,
                12 => 0.5,
                _ => 8.0 - x as f32,
            };
            assert!((v - expected).abs() < 1e-4, "({x}, {y}): {v} != {expected}");
        }
    }

    #[test]
    fn overscan_outside_amp_is_rejected() {
        let mut mi = MaskedImage::new(4, 4);
        let result = overscan_correction(
            &mut mi.full_view_mut(),
            &BBox::new(3, 0, 2, 4),
            OverscanFitType::Mean,
            0,
        );
        assert!(matches!(result, Err(IsrError::OutOfBounds(_))));
    }
}
