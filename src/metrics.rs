//! Prometheus instrumentation: HTTP middleware counters, WebSocket
//! connection gauges and the text exposition endpoint.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, TextEncoder,
};

fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    prometheus::default_registry()
        .register(Box::new(collector.clone()))
        .expect("metric registration");
    collector
}

static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register(
        IntCounterVec::new(
            Opts::new(
                "marketplace_service_http_requests_total",
                "HTTP requests by method, route and status",
            ),
            &["method", "route", "status"],
        )
        .expect("marketplace_service_http_requests_total"),
    )
});

static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register(
        HistogramVec::new(
            HistogramOpts::new(
                "marketplace_service_http_request_duration_seconds",
                "HTTP request latency by method, route and status",
            )
            .buckets(vec![0.002, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "route", "status"],
        )
        .expect("marketplace_service_http_request_duration_seconds"),
    )
});

static WS_CONNECTIONS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register(
        IntGaugeVec::new(
            Opts::new(
                "marketplace_service_ws_active_connections",
                "Open WebSocket connections by channel kind",
            ),
            &["channel"],
        )
        .expect("marketplace_service_ws_active_connections"),
    )
});

pub fn ws_connection_opened(channel: &str) {
    WS_CONNECTIONS.with_label_values(&[channel]).inc();
}

pub fn ws_connection_closed(channel: &str) {
    WS_CONNECTIONS.with_label_values(&[channel]).dec();
}

/// Router-wide middleware recording one counter bump and one latency sample
/// per request, labeled by the matched route template.
pub async fn track_http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let started = Instant::now();
    let response = next.run(req).await;
    let status = response.status();

    let labels = [method.as_str(), route.as_str(), status.as_str()];
    HTTP_REQUESTS.with_label_values(&labels).inc();
    HTTP_LATENCY
        .with_label_values(&labels)
        .observe(started.elapsed().as_secs_f64());

    response
}

/// GET /metrics
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }
    ([(header::CONTENT_TYPE, encoder.format_type().to_owned())], buffer).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn requests_are_counted_by_method_route_and_status() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn(track_http_metrics));

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let counted = HTTP_REQUESTS
            .with_label_values(&["GET", "/ping", "200"])
            .get();
        assert!(counted >= 1);
    }

    #[tokio::test]
    async fn exposition_is_prometheus_text() {
        ws_connection_opened("chat");
        ws_connection_closed("chat");

        let response = metrics_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        assert!(content_type.starts_with("text/plain"));
    }
}
