//! Per-sensor data handles: where raw frames and calibrations come from and where
//! corrected exposures go.

pub mod directory;
pub mod memory;

use crate::image::exposure::{Exposure, RawExposure};
use crate::prelude::IsrResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use directory::DirectoryDataRef;
pub use memory::InMemoryDataRef;

/// Named datasets a sensor handle can serve or accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetType {
    Raw,
    Bias,
    Dark,
    Flat,
    Illum,
    VisitCcd,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Bias => "bias",
            Self::Dark => "dark",
            Self::Flat => "flat",
            Self::Illum => "illum",
            Self::VisitCcd => "visitCCD",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys identifying one sensor of one visit, e.g. `visit=12, ccd=3`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataId(BTreeMap<String, String>);

impl DataId {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Filesystem-safe form, `key=value` pairs joined by `_`.
    pub fn slug(&self) -> String {
        if self.0.is_empty() {
            return "default".to_string();
        }
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Access to the datasets of a single sensor.
pub trait SensorDataRef {
    fn data_id(&self) -> &DataId;
    fn get_raw(&self) -> IsrResult<RawExposure>;
    /// Fetches a calibration or previously written dataset.
    fn get(&self, dataset: DatasetType) -> IsrResult<Exposure>;
    fn put(&mut self, exposure: &Exposure, dataset: DatasetType) -> IsrResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_id_formats() {
        let id = DataId::new().with("visit", 12).with("ccd", 3);
        assert_eq!(id.to_string(), "{ccd: 3, visit: 12}");
        assert_eq!(id.slug(), "ccd=3_visit=12");
        assert_eq!(id.get("visit"), Some("12"));
        assert_eq!(DataId::new().slug(), "default");
    }

    #[test]
    fn dataset_names_match_butler_conventions() {
        assert_eq!(DatasetType::VisitCcd.to_string(), "visitCCD");
        assert_eq!(DatasetType::Flat.as_str(), "flat");
    }
}
