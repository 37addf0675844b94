pub mod metrics;
pub mod period;
pub mod stream;
