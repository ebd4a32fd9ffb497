use crate::image::masked_image::{MaskedImage, MaskedImageViewMut};
use crate::math::stats::StatsHelper;
use crate::prelude::{IsrError, IsrResult};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// How the flat is scaled before dividing it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlatScalingType {
    /// Scale by the configured user value.
    User,
    /// Normalize by the flat's mean.
    Mean,
    /// Normalize by the flat's median.
    Median,
}

/// `image -= bias`; bias mask bits are carried over.
pub fn bias_correction(target: &mut MaskedImageViewMut<'_>, bias: &MaskedImage) -> IsrResult<()> {
    target.check_same_shape(bias)?;
    target.image -= bias.image();
    Zip::from(&mut target.mask)
        .and(bias.mask())
        .for_each(|m, &b| *m |= b);
    Ok(())
}

/// `image -= dark * exp_time / dark_exp_time`.
pub fn dark_correction(
    target: &mut MaskedImageViewMut<'_>,
    dark: &MaskedImage,
    exp_time: f64,
    dark_exp_time: f64,
) -> IsrResult<()> {
    target.check_same_shape(dark)?;
    if !(dark_exp_time.is_finite() && dark_exp_time > 0.0) {
        return Err(IsrError::InvalidInput(format!(
            "dark exposure time must be positive, got {dark_exp_time}"
        )));
    }
    let scale = (exp_time / dark_exp_time) as f32;
    Zip::from(&mut target.image)
        .and(dark.image())
        .for_each(|v, &d| *v -= d * scale);
    Zip::from(&mut target.mask)
        .and(dark.mask())
        .for_each(|m, &b| *m |= b);
    Ok(())
}

/// Recomputes variance from the pixel values: `image / gain + read_noise^2`.
pub fn update_variance(
    target: &mut MaskedImageViewMut<'_>,
    gain: f64,
    read_noise: f64,
) -> IsrResult<()> {
    if !(gain.is_finite() && gain > 0.0) {
        return Err(IsrError::InvalidInput(format!(
            "gain must be positive, got {gain}"
        )));
    }
    let inv_gain = (1.0 / gain) as f32;
    let floor = (read_noise * read_noise) as f32;
    Zip::from(&mut target.variance)
        .and(&target.image)
        .for_each(|var, &v| *var = v * inv_gain + floor);
    Ok(())
}

/// Divides by the flat after scaling it by `1 / scale`, where `scale` follows `scaling`.
pub fn flat_correction(
    target: &mut MaskedImageViewMut<'_>,
    flat: &MaskedImage,
    scaling: FlatScalingType,
    user_scale: f64,
) -> IsrResult<()> {
    let pixels = flat.image().iter().copied();
    let scale = match scaling {
        FlatScalingType::User => Some(user_scale),
        FlatScalingType::Mean => StatsHelper::mean(pixels),
        FlatScalingType::Median => StatsHelper::median(pixels),
    }
    .ok_or_else(|| IsrError::InvalidInput("flat has no finite pixels".into()))?;
    scaled_divide(target, flat, scale)
}

/// Divides by the illumination correction after scaling it by `1 / scale`.
pub fn illumination_correction(
    target: &mut MaskedImageViewMut<'_>,
    illum: &MaskedImage,
    scale: f64,
) -> IsrResult<()> {
    scaled_divide(target, illum, scale)
}

fn scaled_divide(
    target: &mut MaskedImageViewMut<'_>,
    divisor: &MaskedImage,
    scale: f64,
) -> IsrResult<()> {
    target.check_same_shape(divisor)?;
    if !(scale.is_finite() && scale != 0.0) {
        return Err(IsrError::InvalidInput(format!(
            "scale must be finite and non-zero, got {scale}"
        )));
    }
    let scale = scale as f32;
    Zip::from(&mut target.image)
        .and(&mut target.variance)
        .and(divisor.image())
        .for_each(|v, var, &d| {
            let factor = scale / d;
            *v *= factor;
            *var *= factor * factor;
        });
    Zip::from(&mut target.mask)
        .and(divisor.mask())
        .for_each(|m, &b| *m |= b);
    Ok(())
}
