//! Metric type implementations.

pub mod family;
pub mod gauge;

/// Prometheus metric type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricType {
    /// Instantaneous value without implied monotonicity.
    Gauge,
}

impl MetricType {
    /// Returns the given metric type's str representation.
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Gauge => "gauge",
        }
    }
}
