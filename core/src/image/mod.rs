pub mod exposure;
pub mod geom;
pub mod mask;
pub mod masked_image;

pub use exposure::{float_image_from_int, Calib, Exposure, MetadataValue, PropertySet, RawExposure};
pub use geom::BBox;
pub use mask::{MaskPixel, MaskPlaneDict};
pub use masked_image::{MaskedImage, MaskedImageViewMut};
