//! Shared metric definition types. Each engine crate declares its metrics
//! as `MetricDef` consts in its own `metrics_defs` module and emits them
//! through the `metrics` facade; the binary registers their descriptions
//! when an exporter is installed.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

/// Increments require a `metrics` dependency in the calling crate.
#[macro_export]
macro_rules! counter {
    ($def:expr) => {
        metrics::counter!($def.name)
    };
}
