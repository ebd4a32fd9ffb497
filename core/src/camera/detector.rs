use crate::camera::defect::Defect;
use crate::camera::linearity::LinearityType;
use crate::image::geom::BBox;
use crate::prelude::{IsrError, IsrResult};
use serde::{Deserialize, Serialize};

/// Gain, read noise and saturation for a CCD or one of its amplifiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectronicParams {
    /// Electrons per ADU.
    pub gain: f64,
    /// Read noise in ADU.
    pub read_noise: f64,
    /// Level in ADU at and above which pixels are saturated.
    pub saturation_level: f64,
}

impl Default for ElectronicParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            read_noise: 0.0,
            saturation_level: 65535.0,
        }
    }
}

/// An independently read region of a CCD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amplifier {
    pub name: String,
    /// Data region in assembled CCD coordinates.
    pub bbox: BBox,
    /// Every pixel this amp reads out, in raw coordinates.
    pub raw_bbox: BBox,
    /// Light-sensitive region, in raw coordinates.
    pub raw_data_bbox: BBox,
    /// Overscan region, in raw coordinates.
    pub raw_bias_bbox: BBox,
    #[serde(default)]
    pub raw_flip_x: bool,
    #[serde(default)]
    pub raw_flip_y: bool,
    pub electronic: ElectronicParams,
    #[serde(default)]
    pub linearity_type: LinearityType,
    #[serde(default)]
    pub linearity_coeffs: Vec<f64>,
}

impl Amplifier {
    /// Amplifier whose raw layout coincides with its assembled data region and has no overscan.
    pub fn new(name: impl Into<String>, bbox: BBox, electronic: ElectronicParams) -> Self {
        Self {
            name: name.into(),
            bbox,
            raw_bbox: bbox,
            raw_data_bbox: bbox,
            raw_bias_bbox: BBox::default(),
            raw_flip_x: false,
            raw_flip_y: false,
            electronic,
            linearity_type: LinearityType::None,
            linearity_coeffs: Vec::new(),
        }
    }

    pub fn with_raw_layout(mut self, raw_bbox: BBox, raw_data_bbox: BBox, raw_bias_bbox: BBox) -> Self {
        self.raw_bbox = raw_bbox;
        self.raw_data_bbox = raw_data_bbox;
        self.raw_bias_bbox = raw_bias_bbox;
        self
    }

    pub fn with_flips(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.raw_flip_x = flip_x;
        self.raw_flip_y = flip_y;
        self
    }

    pub fn with_linearity(mut self, kind: LinearityType, coeffs: Vec<f64>) -> Self {
        self.linearity_type = kind;
        self.linearity_coeffs = coeffs;
        self
    }
}

/// A CCD: its amplifiers plus CCD-wide electronics and static defects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    pub id: String,
    /// Assembled (trimmed) extent.
    pub bbox: BBox,
    pub amps: Vec<Amplifier>,
    pub electronic: ElectronicParams,
    #[serde(default)]
    pub defects: Vec<Defect>,
}

impl Detector {
    pub fn new(
        id: impl Into<String>,
        bbox: BBox,
        amps: Vec<Amplifier>,
        electronic: ElectronicParams,
    ) -> Self {
        Self {
            id: id.into(),
            bbox,
            amps,
            electronic,
            defects: Vec::new(),
        }
    }

    pub fn with_defects(mut self, defects: Vec<Defect>) -> Self {
        self.defects = defects;
        self
    }

    pub fn first_amp(&self) -> IsrResult<&Amplifier> {
        self.amps.first().ok_or_else(|| {
            IsrError::InvalidInput(format!("detector {} has no amplifiers", self.id))
        })
    }

    /// Smallest box holding every amplifier's raw pixels.
    pub fn raw_extent(&self) -> BBox {
        let x_end = self
            .amps
            .iter()
            .map(|amp| amp.raw_bbox.x0 + amp.raw_bbox.width)
            .max()
            .unwrap_or(0);
        let y_end = self
            .amps
            .iter()
            .map(|amp| amp.raw_bbox.y0 + amp.raw_bbox.height)
            .max()
            .unwrap_or(0);
        BBox::with_dims(x_end, y_end)
    }
}

/// Either a whole CCD or a single amplifier, for helpers that accept only one granularity.
#[derive(Debug, Clone, Copy)]
pub enum DetectorComponent<'a> {
    Ccd(&'a Detector),
    Amp(&'a Amplifier),
}

impl<'a> DetectorComponent<'a> {
    /// Fails unless this is an amplifier.
    pub fn as_amp(&self) -> IsrResult<&'a Amplifier> {
        match *self {
            Self::Amp(amp) => Ok(amp),
            Self::Ccd(ccd) => Err(IsrError::NotAnAmplifier(ccd.id.clone())),
        }
    }
}
