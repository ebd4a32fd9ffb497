use crate::camera::defect::Defect;
use crate::image::masked_image::MaskedImageViewMut;
use crate::isr::defects::interpolate_defect_list;
use crate::isr::footprint::{find_footprints, Footprint};
use crate::prelude::IsrResult;

/// Flags pixels at or above `threshold` with `mask_name`, growing each footprint by `grow`.
pub fn make_threshold_mask(
    target: &mut MaskedImageViewMut<'_>,
    threshold: f64,
    grow: usize,
    mask_name: &str,
) -> IsrResult<Vec<Footprint>> {
    let bits = target.planes.plane_bit_mask(mask_name)?;
    let (width, height) = (target.width(), target.height());
    let footprints: Vec<Footprint> =
        find_footprints(target.image.view(), |v| f64::from(v) >= threshold)
            .into_iter()
            .map(|fp| fp.grown(grow, width, height))
            .collect();
    for footprint in &footprints {
        footprint.set_mask(&mut target.mask, bits);
    }
    Ok(footprints)
}

/// Detects saturated pixels and interpolates over them in one pass.
///
/// Only suitable for single-amplifier CCDs: bleed trails that cross amplifier
/// boundaries are cut at the edge of `target`.
pub fn saturation_correction(
    target: &mut MaskedImageViewMut<'_>,
    saturation: f64,
    fwhm: f64,
    grow: usize,
    mask_name: &str,
) -> IsrResult<usize> {
    let footprints = make_threshold_mask(target, saturation, grow, mask_name)?;
    let defects: Vec<Defect> = footprints
        .iter()
        .flat_map(Footprint::to_bboxes)
        .map(Defect::new)
        .collect();
    interpolate_defect_list(target, &defects, fwhm)?;
    Ok(footprints.iter().map(Footprint::npix).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::geom::BBox;
    use crate::image::mask::{BAD, INTRP, SAT};
    use crate::image::masked_image::MaskedImage;
    use crate::isr::defects::interpolate_from_mask;

    const SATURATION: f32 = 1000.0;

    fn image_with_bleed() -> MaskedImage {
        let mut mi = MaskedImage::new(20, 20);
        mi.set(100.0, 0, 1.0);
        mi.view_mut(&BBox::from_corners(9, 5, 9, 15))
            .unwrap()
            .image
            .fill(SATURATION);
        mi
    }

    #[test]
    fn saturation_is_masked_then_interpolated_with_growth() {
        let mut mi = image_with_bleed();
        {
            let mut view = mi.full_view_mut();
            make_threshold_mask(&mut view, f64::from(SATURATION), 0, SAT).unwrap();
            interpolate_from_mask(&mut view, 5.0, 1, SAT).unwrap();
        }

        let planes = mi.planes();
        let bad = planes.plane_bit_mask(BAD).unwrap();
        let sat = planes.plane_bit_mask(SAT).unwrap();
        let intrp = planes.plane_bit_mask(INTRP).unwrap();
        for ((j, i), &m) in mi.mask().indexed_iter() {
            assert_eq!(m & bad, 0);
            if !(8..=10).contains(&i) {
                assert_eq!(m, 0, "({i}, {j})");
                continue;
            }
            match (i, j) {
                (8 | 10, 4 | 16) => {
                    assert_eq!(m & intrp, 0);
                    assert_eq!(m & sat, 0);
                }
                (8 | 10, 5..=15) => {
                    assert_eq!(m & intrp, intrp);
                    assert_eq!(m & sat, 0);
                }
                (9, 4 | 16) => assert_eq!(m & intrp, intrp),
                (9, 5..=15) => {
                    assert_eq!(m & intrp, intrp);
                    assert_eq!(m & sat, sat);
                }
                _ => assert_eq!(m, 0, "({i}, {j})"),
            }
        }
        assert!(mi.image().iter().all(|&v| (v - 100.0).abs() < 1e-4));
    }

    #[test]
    fn one_step_correction_grows_the_mask() {
        let mut mi = image_with_bleed();
        let flagged =
            saturation_correction(&mut mi.full_view_mut(), f64::from(SATURATION), 2.0, 1, SAT)
                .unwrap();
        assert_eq!(flagged, 11 * 3 + 2);
        let sat = mi.planes().plane_bit_mask(SAT).unwrap();
        assert_eq!(mi.mask()[[10, 8]] & sat, sat);
        assert!(mi.image().iter().all(|&v| (v - 100.0).abs() < 1e-4));
    }

    #[test]
    fn unknown_plane_fails() {
        let mut mi = image_with_bleed();
        assert!(make_threshold_mask(&mut mi.full_view_mut(), 1.0, 0, "NOPE").is_err());
    }
}
