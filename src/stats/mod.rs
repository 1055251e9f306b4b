//! Statistics engine: flat field grouping and per-record derived metrics

pub mod derived;
pub mod grouping;

pub use derived::{derive, DerivedMetrics, SlaStatus};
pub use grouping::{group_by, GroupStats};
