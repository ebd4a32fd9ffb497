use serde::{Deserialize, Serialize};
use std::fmt;

/// Linearity model named by an amplifier's camera description.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinearityType {
    #[default]
    None,
    Proportional,
    Unsupported(String),
}

impl LinearityType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Proportional => "PROPORTIONAL",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<&str> for LinearityType {
    fn from(value: &str) -> Self {
        match value {
            "NONE" => Self::None,
            "PROPORTIONAL" => Self::Proportional,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl From<String> for LinearityType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<LinearityType> for String {
    fn from(value: LinearityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LinearityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-amplifier correction, resolved from type and coefficients before any pixel is touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinearityCorrection {
    None,
    /// `v *= 1 + square_coeff * v`; pixels above `max_uncorr` are suspect when it is positive.
    Proportional { square_coeff: f64, max_uncorr: f64 },
}

impl LinearityCorrection {
    pub fn is_noop(&self) -> bool {
        match *self {
            Self::None => true,
            Self::Proportional {
                square_coeff,
                max_uncorr,
            } => max_uncorr <= 0.0 && square_coeff == 0.0,
        }
    }
}
