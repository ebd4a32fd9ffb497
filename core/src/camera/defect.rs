use crate::image::geom::BBox;
use serde::{Deserialize, Serialize};

/// Rectangular region of known-bad pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    pub bbox: BBox,
}

impl Defect {
    pub fn new(bbox: BBox) -> Self {
        Self { bbox }
    }

    pub fn x0(&self) -> usize {
        self.bbox.x0
    }

    pub fn y0(&self) -> usize {
        self.bbox.y0
    }
}

pub type DefectList = Vec<Defect>;
