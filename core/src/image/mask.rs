use crate::prelude::{IsrError, IsrResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type MaskPixel = u32;

const MAX_PLANES: u8 = MaskPixel::BITS as u8;

pub const BAD: &str = "BAD";
pub const SAT: &str = "SAT";
pub const INTRP: &str = "INTRP";
pub const SUSPECT: &str = "SUSPECT";
pub const UNMASKEDNAN: &str = "UNMASKEDNAN";

const DEFAULT_PLANES: [&str; 9] = [
    BAD,
    SAT,
    INTRP,
    "CR",
    "EDGE",
    "DETECTED",
    "DETECTED_NEGATIVE",
    SUSPECT,
    "NO_DATA",
];

/// Maps mask plane names to bit positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskPlaneDict {
    planes: BTreeMap<String, u8>,
}

impl MaskPlaneDict {
    pub fn new() -> Self {
        let planes = DEFAULT_PLANES
            .iter()
            .enumerate()
            .map(|(bit, name)| (name.to_string(), bit as u8))
            .collect();
        Self { planes }
    }

    /// Adds a plane if missing and returns its bit position.
    pub fn add_plane(&mut self, name: &str) -> IsrResult<u8> {
        if let Some(&bit) = self.planes.get(name) {
            return Ok(bit);
        }
        let next = self.planes.values().copied().max().map_or(0, |b| b + 1);
        if next >= MAX_PLANES {
            return Err(IsrError::InvalidInput(format!(
                "no free mask bit for plane {name:?}"
            )));
        }
        self.planes.insert(name.to_string(), next);
        Ok(next)
    }

    pub fn plane_bit_mask(&self, name: &str) -> IsrResult<MaskPixel> {
        self.planes
            .get(name)
            .map(|&bit| 1 << bit)
            .ok_or_else(|| IsrError::UnknownMaskPlane(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.planes.contains_key(name)
    }
}

impl Default for MaskPlaneDict {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_planes_have_distinct_bits() {
        let dict = MaskPlaneDict::new();
        assert_eq!(dict.plane_bit_mask(BAD).unwrap(), 1);
        assert_eq!(dict.plane_bit_mask(SAT).unwrap(), 2);
        assert_ne!(
            dict.plane_bit_mask(SUSPECT).unwrap(),
            dict.plane_bit_mask(INTRP).unwrap()
        );
    }

    #[test]
    fn add_plane_is_idempotent() {
        let mut dict = MaskPlaneDict::new();
        let bit = dict.add_plane(UNMASKEDNAN).unwrap();
        assert_eq!(dict.add_plane(UNMASKEDNAN).unwrap(), bit);
        assert_eq!(dict.plane_bit_mask(UNMASKEDNAN).unwrap(), 1 << bit);
    }

    #[test]
    fn unknown_plane_is_an_error() {
        let dict = MaskPlaneDict::new();
        assert!(matches!(
            dict.plane_bit_mask("NOPE"),
            Err(IsrError::UnknownMaskPlane(_))
        ));
    }
}
