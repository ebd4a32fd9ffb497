use crate::image::mask::SAT;
use crate::isr::{FlatScalingType, OverscanFitType};
use crate::prelude::{IsrError, IsrResult};
use serde::{Deserialize, Serialize};

/// Settings for assembling amplifier segments into one CCD image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleCcdConfig {
    /// Record the effective gain of the assembled CCD in its `GAIN` header.
    pub set_gain: bool,
    /// Rescale every amp to unity gain; ignored when `set_gain` is false.
    pub re_norm: bool,
    /// Header keys dropped from the assembled exposure.
    pub keys_to_remove: Vec<String>,
}

impl Default for AssembleCcdConfig {
    fn default() -> Self {
        Self {
            set_gain: true,
            re_norm: true,
            keys_to_remove: Vec::new(),
        }
    }
}

impl AssembleCcdConfig {
    pub fn effective_re_norm(&self) -> bool {
        self.set_gain && self.re_norm
    }
}

/// Configuration for [`IsrTask`](crate::processing::IsrTask).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsrTaskConfig {
    /// Persist the corrected exposure as `visitCCD`.
    pub do_write: bool,
    pub assemble_ccd: AssembleCcdConfig,
    /// PSF FWHM in pixels; sets how many neighbours feed each side of an interpolation.
    pub fwhm: f64,
    /// Mask plane used for both saturation detection and interpolation.
    pub saturated_mask_name: String,
    pub flat_scaling_type: FlatScalingType,
    /// Flat scale when `flat_scaling_type` is `USER`; ignored otherwise.
    pub flat_user_scale: f64,
    pub overscan_fit_type: OverscanFitType,
    /// Polynomial order when `overscan_fit_type` is `POLY`.
    pub overscan_poly_order: usize,
    pub grow_saturation_footprint_size: usize,
    /// Growth applied to defect and NaN footprints.
    pub grow_defect_footprint_size: usize,
    /// Divide by the `illum` dataset after flat-fielding.
    pub do_illumination: bool,
    pub illum_user_scale: f64,
}

impl Default for IsrTaskConfig {
    fn default() -> Self {
        Self {
            do_write: true,
            assemble_ccd: AssembleCcdConfig::default(),
            fwhm: 1.0,
            saturated_mask_name: SAT.to_string(),
            flat_scaling_type: FlatScalingType::User,
            flat_user_scale: 1.0,
            overscan_fit_type: OverscanFitType::Median,
            overscan_poly_order: 1,
            grow_saturation_footprint_size: 1,
            grow_defect_footprint_size: 1,
            do_illumination: false,
            illum_user_scale: 1.0,
        }
    }
}

impl IsrTaskConfig {
    pub fn validate(&self) -> IsrResult<()> {
        if !(self.fwhm.is_finite() && self.fwhm > 0.0) {
            return Err(IsrError::InvalidConfig(format!(
                "fwhm must be positive, got {}",
                self.fwhm
            )));
        }
        if self.saturated_mask_name.trim().is_empty() {
            return Err(IsrError::InvalidConfig(
                "saturated_mask_name must not be empty".into(),
            ));
        }
        let scales = [
            ("flat_user_scale", self.flat_user_scale),
            ("illum_user_scale", self.illum_user_scale),
        ];
        for (name, value) in scales {
            if !value.is_finite() || value == 0.0 {
                return Err(IsrError::InvalidConfig(format!(
                    "{name} must be finite and non-zero, got {value}"
                )));
            }
        }
        Ok(())
    }
}
