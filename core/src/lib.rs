//! Instrument signature removal for CCD sensors.
//!
//! Raw sensor frames are corrected amp by amp and then per CCD (overscan, bias, dark,
//! flat, illumination), assembled into a trimmed image, and cleaned of defects,
//! saturated pixels and NaNs. Every step mutates one owned masked image in place
//! through exclusive per-amplifier views.

pub mod camera;
pub mod data_ref;
pub mod image;
pub mod isr;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use data_ref::{DataId, DatasetType, SensorDataRef};
pub use prelude::{IsrError, IsrResult, Task};
pub use processing::{IsrTask, IsrTaskConfig, ProportionalLinearizeTask};
