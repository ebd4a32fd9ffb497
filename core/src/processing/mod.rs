pub mod assemble;
pub mod config;
pub mod isr_task;
pub mod linearize;

pub use assemble::AssembleCcdTask;
pub use config::{AssembleCcdConfig, IsrTaskConfig};
pub use isr_task::IsrTask;
pub use linearize::ProportionalLinearizeTask;
