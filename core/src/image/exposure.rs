use crate::camera::Detector;
use crate::image::masked_image::MaskedImage;
use crate::prelude::{IsrError, IsrResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar header value attached to an exposure or recorded by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

pub type PropertySet = BTreeMap<String, MetadataValue>;

/// Photometric calibration record; only the exposure time is used here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calib {
    pub exp_time: f64,
}

impl Default for Calib {
    fn default() -> Self {
        Self { exp_time: 1.0 }
    }
}

/// Masked image plus the detector and header data describing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub masked_image: MaskedImage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector: Option<Detector>,
    #[serde(default)]
    pub calib: Calib,
    #[serde(default)]
    pub metadata: PropertySet,
}

impl Exposure {
    pub fn new(masked_image: MaskedImage) -> Self {
        Self {
            masked_image,
            detector: None,
            calib: Calib::default(),
            metadata: PropertySet::new(),
        }
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn detector(&self) -> IsrResult<&Detector> {
        self.detector.as_ref().ok_or(IsrError::MissingDetector)
    }

    pub fn width(&self) -> usize {
        self.masked_image.width()
    }

    pub fn height(&self) -> usize {
        self.masked_image.height()
    }
}

/// Integer pixels as read off the sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExposure {
    pub image: Array2<i32>,
    pub detector: Detector,
    #[serde(default)]
    pub calib: Calib,
    #[serde(default)]
    pub metadata: PropertySet,
}

/// Converts a raw integer exposure into a floating-point masked exposure.
pub fn float_image_from_int(raw: RawExposure) -> Exposure {
    let image = raw.image.mapv(|v| v as f32);
    Exposure {
        masked_image: MaskedImage::from_image(image),
        detector: Some(raw.detector),
        calib: raw.calib,
        metadata: raw.metadata,
    }
}
