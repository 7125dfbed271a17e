use bundle::metrics_defs::{MetricDef, MetricType};

pub const BATCHES_SUBMITTED: MetricDef = MetricDef {
    name: "submit.batches",
    metric_type: MetricType::Counter,
    description: "Batches submitted to the destination endpoint",
};

pub const BATCHES_FAILED: MetricDef = MetricDef {
    name: "submit.batches.failed",
    metric_type: MetricType::Counter,
    description: "Batches rejected by the destination or lost to transport errors",
};

pub const RECORDS_SUCCEEDED: MetricDef = MetricDef {
    name: "submit.records.succeeded",
    metric_type: MetricType::Counter,
    description: "Records accepted by the destination",
};

pub const RECORDS_FAILED: MetricDef = MetricDef {
    name: "submit.records.failed",
    metric_type: MetricType::Counter,
    description: "Records classified failed with their batch",
};

pub const ALL_METRICS: &[MetricDef] = &[
    BATCHES_SUBMITTED,
    BATCHES_FAILED,
    RECORDS_SUCCEEDED,
    RECORDS_FAILED,
];
