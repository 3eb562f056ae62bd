pub mod counters;
pub mod opts;

pub use counters::CorrectionCounters;
