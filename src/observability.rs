use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP operations. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "fieldbook_requests_total";

/// Histogram: operation latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "fieldbook_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: bookings rejected because the field was taken. Labels: field.
pub const BOOKING_CONFLICTS_TOTAL: &str = "fieldbook_booking_conflicts_total";

/// Counter: rows removed by a cascade (not counting the deleted root). Labels: entity.
pub const CASCADE_DELETED_TOTAL: &str = "fieldbook_cascade_deleted_total";

/// Counter: rejected credentials.
pub const AUTH_FAILURES_TOTAL: &str = "fieldbook_auth_failures_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "fieldbook_wal_flush_duration_seconds";

/// Gauge: open scoreboard websocket subscriptions.
pub const SCOREBOARD_SUBSCRIBERS: &str = "fieldbook_scoreboard_subscribers";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Record one finished HTTP operation.
pub fn record_request(op: String, status: u16, started: std::time::Instant) {
    metrics::counter!(REQUESTS_TOTAL, "op" => op.clone(), "status" => status.to_string()).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "op" => op).record(started.elapsed().as_secs_f64());
}
