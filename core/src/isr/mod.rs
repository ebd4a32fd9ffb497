//! Pixel-level correction kernels used by the ISR tasks.

pub mod calibration;
pub mod defects;
pub mod footprint;
pub mod nan;
pub mod overscan;
pub mod saturation;

pub use calibration::{
    bias_correction, dark_correction, flat_correction, illumination_correction, update_variance,
    FlatScalingType,
};
pub use defects::{
    get_defect_list_from_mask, interpolate_defect_list, interpolate_from_mask,
    mask_pixels_from_defect_list, transpose_defect_list,
};
pub use footprint::{find_footprints, find_mask_footprints, Footprint, Span};
pub use nan::{mask_nans, UnmaskedNanCounter};
pub use overscan::{overscan_correction, OverscanFitType};
pub use saturation::{make_threshold_mask, saturation_correction};
