use crate::camera::defect::{Defect, DefectList};
use crate::image::mask::INTRP;
use crate::image::masked_image::MaskedImageViewMut;
use crate::isr::footprint::find_mask_footprints;
use crate::math::stats::StatsHelper;
use crate::prelude::{IsrError, IsrResult};
use ndarray::Array2;

/// Sets `mask_name` on every pixel covered by `defects`.
pub fn mask_pixels_from_defect_list(
    target: &mut MaskedImageViewMut<'_>,
    defects: &[Defect],
    mask_name: &str,
) -> IsrResult<()> {
    let bits = target.planes.plane_bit_mask(mask_name)?;
    for defect in defects {
        target.sub_view(&defect.bbox)?.mask.mapv_inplace(|m| m | bits);
    }
    Ok(())
}

/// Builds a defect list from the pixels flagged with `mask_name`, one defect per span of
/// each footprint after growing it by `grow` pixels.
pub fn get_defect_list_from_mask(
    target: &MaskedImageViewMut<'_>,
    mask_name: &str,
    grow: usize,
) -> IsrResult<DefectList> {
    let bits = target.planes.plane_bit_mask(mask_name)?;
    let (width, height) = (target.width(), target.height());
    Ok(find_mask_footprints(target.mask.view(), bits)
        .into_iter()
        .flat_map(|fp| fp.grown(grow, width, height).to_bboxes())
        .map(Defect::new)
        .collect())
}

/// Replaces defect pixels by linear interpolation along each row and flags them `INTRP`.
///
/// Each side of a bad run contributes the mean of up to `fwhm` (rounded, at least one)
/// adjacent good pixels. Runs with no usable neighbour take the median of all good pixels.
pub fn interpolate_defect_list(
    target: &mut MaskedImageViewMut<'_>,
    defects: &[Defect],
    fwhm: f64,
) -> IsrResult<()> {
    if defects.is_empty() {
        return Ok(());
    }
    let intrp = target.planes.plane_bit_mask(INTRP)?;
    let bounds = target.bbox();
    let mut bad = Array2::from_elem((target.height(), target.width()), false);
    for defect in defects {
        if !bounds.contains_box(&defect.bbox) {
            return Err(IsrError::OutOfBounds(defect.bbox.to_string()));
        }
        for y in defect.bbox.rows() {
            for x in defect.bbox.cols() {
                bad[[y, x]] = true;
            }
        }
    }

    let fallback = StatsHelper::median(
        target
            .image
            .iter()
            .zip(bad.iter())
            .filter(|(_, is_bad)| !**is_bad)
            .map(|(v, _)| *v),
    )
    .unwrap_or(0.0) as f32;
    let reach = (fwhm.round() as usize).max(1);
    let width = target.width();

    for y in 0..target.height() {
        let mut x = 0;
        while x < width {
            if !bad[[y, x]] {
                x += 1;
                continue;
            }
            let start = x;
            while x < width && bad[[y, x]] {
                x += 1;
            }
            let end = x;

            let row = target.image.row(y);
            let good = |i: usize| !bad[[y, i]] && row[i].is_finite();
            let left = StatsHelper::mean(
                (0..start)
                    .rev()
                    .take_while(|&i| !bad[[y, i]])
                    .filter(|&i| good(i))
                    .take(reach)
                    .map(|i| row[i]),
            );
            let right = StatsHelper::mean(
                (end..width)
                    .take_while(|&i| !bad[[y, i]])
                    .filter(|&i| good(i))
                    .take(reach)
                    .map(|i| row[i]),
            );

            for i in start..end {
                let value = match (left, right) {
                    (Some(l), Some(r)) => {
                        let frac = (i + 1 - start) as f64 / (end - start + 1) as f64;
                        (l + (r - l) * frac) as f32
                    }
                    (Some(l), None) => l as f32,
                    (None, Some(r)) => r as f32,
                    (None, None) => fallback,
                };
                target.image[[y, i]] = value;
                target.mask[[y, i]] |= intrp;
            }
        }
    }
    Ok(())
}

/// Interpolates over pixels flagged with `mask_name`, grown by `grow` pixels.
pub fn interpolate_from_mask(
    target: &mut MaskedImageViewMut<'_>,
    fwhm: f64,
    grow: usize,
    mask_name: &str,
) -> IsrResult<DefectList> {
    let defects = get_defect_list_from_mask(target, mask_name, grow)?;
    interpolate_defect_list(target, &defects, fwhm)?;
    Ok(defects)
}

/// Swaps rows and columns of every defect.
pub fn transpose_defect_list(defects: &[Defect]) -> DefectList {
    defects
        .iter()
        .map(|d| Defect::new(d.bbox.transposed()))
        .collect()
}
