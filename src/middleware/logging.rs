use axum::extract::MatchedPath;
use axum::http;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Level;

/// Request/response trace logging. Spans are keyed on the matched route
/// template so path parameters do not explode the cardinality.
pub fn add_tracing<S: Clone + Send + Sync + 'static>(router: Router<S>) -> Router<S> {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &http::Request<_>| {
                let route = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or_else(|| req.uri().path());
                tracing::span!(
                    Level::INFO,
                    "request",
                    method = %req.method(),
                    route,
                )
            })
            .on_response(
                |res: &http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "handled"
                    );
                },
            ),
    )
}
