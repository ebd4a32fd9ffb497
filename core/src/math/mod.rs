pub mod poly;
pub mod stats;

pub use poly::Polynomial;
pub use stats::StatsHelper;
