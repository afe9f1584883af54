//! Metrics definitions for the parameter store.

use shared::metrics_defs::{MetricDef, MetricType};

pub const PARAM_CACHE_HIT: MetricDef = MetricDef {
    name: "param_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of parameter reads served from the in-process cache",
};

pub const PARAM_CACHE_MISS: MetricDef = MetricDef {
    name: "param_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of parameter reads that required a remote store fetch",
};

pub const ALL_METRICS: &[MetricDef] = &[PARAM_CACHE_HIT, PARAM_CACHE_MISS];
