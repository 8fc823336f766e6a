/*!
 * # Metrics Module
 *
 * Prometheus counters and histograms for HTTP traffic and the business
 * events of the shop floor, exported in text format at `/metrics`.
 */

use axum::{
    extract::{MatchedPath, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("najd".to_string()), None)
        .expect("registry can be created");
    static ref HTTP_REQUESTS: IntCounterVec = register(IntCounterVec::new(
        Opts::new("http_requests_total", "HTTP requests by route and status"),
        &["method", "route", "status"],
    ));
    static ref HTTP_DURATION: HistogramVec = register(HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
        &["method", "route"],
    ));
    static ref ORDERS_CREATED: IntCounter = register(IntCounter::new(
        "orders_created_total",
        "Orders created, including conversions from quotations"
    ));
    static ref ORDER_STATUS_CHANGES: IntCounterVec = register(IntCounterVec::new(
        Opts::new("order_status_changes_total", "Order status transitions by target status"),
        &["status"],
    ));
    static ref PAYMENTS_RECORDED: IntCounter = register(IntCounter::new(
        "payments_recorded_total",
        "Invoice payments recorded"
    ));
    static ref CALLS_STARTED: IntCounter =
        register(IntCounter::new("calls_started_total", "Voice calls started"));
    static ref STOCK_ADJUSTMENTS: IntCounterVec = register(IntCounterVec::new(
        Opts::new("stock_adjustments_total", "Inventory adjustments by direction"),
        &["direction"],
    ));
    static ref EVENTS_PUBLISHED: IntCounterVec = register(IntCounterVec::new(
        Opts::new("events_published_total", "Live feed events by type"),
        &["event"],
    ));
}

fn register<M>(metric: prometheus::Result<M>) -> M
where
    M: prometheus::core::Collector + Clone + 'static,
{
    let metric = metric.expect("metric can be created");
    REGISTRY
        .register(Box::new(metric.clone()))
        .expect("metric can be registered");
    metric
}

pub fn record_order_created() {
    ORDERS_CREATED.inc();
}

pub fn record_status_change(status: &str) {
    ORDER_STATUS_CHANGES.with_label_values(&[status]).inc();
}

pub fn record_payment() {
    PAYMENTS_RECORDED.inc();
}

pub fn record_call_started() {
    CALLS_STARTED.inc();
}

pub fn record_stock_adjustment(increase: bool) {
    let direction = if increase { "in" } else { "out" };
    STOCK_ADJUSTMENTS.with_label_values(&[direction]).inc();
}

pub fn record_event(name: &str) {
    EVENTS_PUBLISHED.with_label_values(&[name]).inc();
}

/// Counts requests and measures latency per matched route.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS
        .with_label_values(&[&method, &route, &status])
        .inc();
    HTTP_DURATION
        .with_label_values(&[&method, &route])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Renders every registered metric in the Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub async fn metrics_handler() -> Response {
    match gather_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_export() {
        record_order_created();
        record_status_change("in_printing");
        record_stock_adjustment(false);

        let text = gather_text().unwrap();
        assert!(text.contains("najd_orders_created_total"));
        assert!(text.contains("status=\"in_printing\""));
        assert!(text.contains("direction=\"out\""));
    }
}
