//! Gateway metrics

use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec,
    HistogramVec, IntGaugeVec,
};

lazy_static::lazy_static! {
    pub static ref GATEWAY_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_requests_total",
        "Total provider calls",
        &["gateway_id", "kind", "outcome"]
    )
    .unwrap();

    pub static ref GATEWAY_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "gateway_request_duration_seconds",
        "Provider call duration",
        &["gateway_id", "kind"]
    )
    .unwrap();

    pub static ref CIRCUIT_BREAKER_STATE: IntGaugeVec = register_int_gauge_vec!(
        "gateway_circuit_state",
        "Circuit breaker state (0=closed, 1=half-open, 2=open)",
        &["gateway_id"]
    )
    .unwrap();

    pub static ref GATEWAY_HEALTH: IntGaugeVec = register_int_gauge_vec!(
        "gateway_health",
        "Gateway health flag (1=up, 0=down)",
        &["gateway_id"]
    )
    .unwrap();

    pub static ref NOTIFICATION_PUBLISH_TOTAL: CounterVec = register_counter_vec!(
        "notification_publish_total",
        "Transaction notifications by outcome",
        &["outcome"]
    )
    .unwrap();
}
