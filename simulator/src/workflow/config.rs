use crate::generator::profile::SensorConfig;
use anyhow::Context;
use isrcore::processing::IsrTaskConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything one driver run needs: ISR settings, the synthetic sensor, and which
/// optional tasks to chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub isr: IsrTaskConfig,
    pub sensor: SensorConfig,
    /// Run proportional linearity correction on the ISR output.
    pub linearize: bool,
    pub transpose_for_interpolation: bool,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .isr
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }
}
