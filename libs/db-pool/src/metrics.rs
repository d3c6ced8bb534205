//! Pool gauges and acquisition latency, exported through the process-wide
//! Prometheus registry.

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, register_int_gauge_vec};
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec};
use sqlx::{pool::PoolConnection, PgPool, Postgres};
use std::time::Instant;

static POOL_CONNECTIONS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "db_pool_connections",
        "Pool connection count by state",
        &["service", "state"]
    )
    .expect("db_pool_connections registration")
});

static ACQUIRE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "db_pool_acquire_duration_seconds",
        "Time spent waiting for a pooled connection",
        &["service"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("db_pool_acquire_duration_seconds registration")
});

static ACQUIRE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "db_pool_acquire_errors_total",
        "Failed connection acquisitions by cause",
        &["service", "cause"]
    )
    .expect("db_pool_acquire_errors_total registration")
});

pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = i64::from(pool.size());
    let idle = pool.num_idle() as i64;

    let gauge = |state: &str, value: i64| {
        POOL_CONNECTIONS
            .with_label_values(&[service, state])
            .set(value);
    };
    gauge("idle", idle);
    gauge("active", size - idle);
    gauge("max", i64::from(pool.options().get_max_connections()));
}

/// `pool.acquire()` with latency and failure accounting
pub async fn acquire_with_metrics(
    pool: &PgPool,
    service: &str,
) -> Result<PoolConnection<Postgres>, sqlx::Error> {
    let started = Instant::now();
    let result = pool.acquire().await;
    ACQUIRE_DURATION
        .with_label_values(&[service])
        .observe(started.elapsed().as_secs_f64());

    if let Err(e) = &result {
        let cause = match e {
            sqlx::Error::PoolTimedOut => "timeout",
            sqlx::Error::PoolClosed => "closed",
            _ => "other",
        };
        ACQUIRE_ERRORS.with_label_values(&[service, cause]).inc();
    }
    result
}
