use bundle::metrics_defs::{MetricDef, MetricType};

pub const CALLS_TOTAL: MetricDef = MetricDef {
    name: "enrich.calls",
    metric_type: MetricType::Counter,
    description: "Enrichment API calls attempted",
};

pub const CALLS_FAILED: MetricDef = MetricDef {
    name: "enrich.calls.failed",
    metric_type: MetricType::Counter,
    description: "Enrichment API calls that fell back to the rule's fallback value",
};

pub const ALL_METRICS: &[MetricDef] = &[CALLS_TOTAL, CALLS_FAILED];
