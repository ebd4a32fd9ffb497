use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use isrcore::data_ref::{DatasetType, SensorDataRef};
use isrcore::image::mask::{BAD, INTRP, SAT, SUSPECT};
use isrcore::image::MaskedImage;
use isrcore::math::StatsHelper;
use isrcore::prelude::Task;
use isrcore::processing::{IsrTask, ProportionalLinearizeTask};
use serde::Serialize;

/// Summary of one processed sensor.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub data_id: String,
    pub width: usize,
    pub height: usize,
    pub mean: f64,
    pub median: f64,
    /// RMS scatter about the median.
    pub residual_rms: f32,
    pub saturated_pixels: usize,
    pub bad_pixels: usize,
    pub interpolated_pixels: usize,
    pub suspect_pixels: usize,
    pub linearized: bool,
    pub num_nans: i64,
    pub isr_seconds: f64,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, sensor_ref: &mut dyn SensorDataRef) -> anyhow::Result<WorkflowResult> {
        let data_id = sensor_ref.data_id().to_string();
        let mut isr_task = IsrTask::new(self.config.isr.clone())
            .context("configuring ISR task")?
            .with_transpose_for_interpolation(self.config.transpose_for_interpolation);
        let mut exposure = isr_task
            .run(&mut *sensor_ref)
            .with_context(|| format!("running ISR on sensor {data_id}"))?;

        let mut linearized = false;
        if self.config.linearize {
            let mut linearizer = ProportionalLinearizeTask::new();
            linearized = linearizer
                .run(&mut exposure)
                .with_context(|| format!("linearizing sensor {data_id}"))?;
            if linearized && self.config.isr.do_write {
                sensor_ref
                    .put(&exposure, DatasetType::VisitCcd)
                    .context("writing linearized exposure")?;
            }
        }

        let metadata = isr_task.metadata();
        let mi = &exposure.masked_image;
        let median = StatsHelper::median(mi.image().iter().copied()).unwrap_or(f64::NAN);
        let residuals: Vec<f32> = mi
            .image()
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| v - median as f32)
            .collect();
        Ok(WorkflowResult {
            data_id,
            width: mi.width(),
            height: mi.height(),
            mean: StatsHelper::mean(mi.image().iter().copied()).unwrap_or(f64::NAN),
            median,
            residual_rms: StatsHelper::rms(&residuals),
            saturated_pixels: count_plane(mi, SAT),
            bad_pixels: count_plane(mi, BAD),
            interpolated_pixels: count_plane(mi, INTRP),
            suspect_pixels: count_plane(mi, SUSPECT),
            linearized,
            num_nans: metadata
                .get("NUMNANS")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            isr_seconds: metadata
                .get("isrDuration")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
        })
    }
}

fn count_plane(mi: &MaskedImage, plane: &str) -> usize {
    match mi.planes().plane_bit_mask(plane) {
        Ok(bits) => mi.mask().iter().filter(|&&m| m & bits != 0).count(),
        Err(_) => 0,
    }
}
