pub mod defect;
pub mod detector;
pub mod linearity;

pub use defect::{Defect, DefectList};
pub use detector::{Amplifier, Detector, DetectorComponent, ElectronicParams};
pub use linearity::{LinearityCorrection, LinearityType};
