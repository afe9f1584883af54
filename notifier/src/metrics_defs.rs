use shared::metrics_defs::{MetricDef, MetricType};

pub const MESSAGES_DELIVERED: MetricDef = MetricDef {
    name: "notifier.messages.delivered",
    metric_type: MetricType::Counter,
    description: "Number of messages delivered to the messaging API",
};

pub const UNAUTHORIZED_REJECTS: MetricDef = MetricDef {
    name: "notifier.unauthorized.rejects",
    metric_type: MetricType::Counter,
    description: "Number of requests rejected because the chat is not authorized",
};

pub const SEND_ATTEMPTS: MetricDef = MetricDef {
    name: "notifier.send.attempts",
    metric_type: MetricType::Counter,
    description: "Number of outbound send attempts, including retries",
};

pub const SEND_RETRIES: MetricDef = MetricDef {
    name: "notifier.send.retries",
    metric_type: MetricType::Counter,
    description: "Number of send attempts that failed with a retryable error",
};

pub const ALL_METRICS: &[MetricDef] = &[
    MESSAGES_DELIVERED,
    UNAUTHORIZED_REJECTS,
    SEND_ATTEMPTS,
    SEND_RETRIES,
];
