use crate::image::mask::{MaskPixel, UNMASKEDNAN};
use crate::image::masked_image::MaskedImageViewMut;
use crate::prelude::IsrResult;
use ndarray::Zip;

/// ORs `mask_val` into pixels whose image or variance is NaN and which carry none of
/// `allow_mask`; returns how many pixels were flagged.
pub fn mask_nans(
    target: &mut MaskedImageViewMut<'_>,
    mask_val: MaskPixel,
    allow_mask: MaskPixel,
) -> usize {
    let mut count = 0;
    Zip::from(&mut target.mask)
        .and(&target.image)
        .and(&target.variance)
        .for_each(|m, &v, &var| {
            if (v.is_nan() || var.is_nan()) && *m & allow_mask == 0 {
                *m |= mask_val;
                count += 1;
            }
        });
    count
}

/// Counts NaN pixels that no other mask plane accounts for, flagging them `UNMASKEDNAN`.
#[derive(Debug, Default)]
pub struct UnmaskedNanCounter {
    npix: usize,
}

impl UnmaskedNanCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the `UNMASKEDNAN` plane to exist on the image.
    pub fn apply(&mut self, target: &mut MaskedImageViewMut<'_>) -> IsrResult<()> {
        let bit = target.planes.plane_bit_mask(UNMASKEDNAN)?;
        self.npix = mask_nans(target, bit, MaskPixel::MAX ^ bit);
        Ok(())
    }

    pub fn npix(&self) -> usize {
        self.npix
    }
}
