use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("initializing metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Acquisition metrics
    pub acquisition_attempts: IntCounterVec,
    pub acquisition_failures: IntCounterVec,
    pub acquisition_duration: HistogramVec,
    pub cache_hits: IntCounter,

    // Renewal metrics
    pub renewal_successes: IntCounter,
    pub renewal_failures: IntCounter,

    // Token/runtime
    pub token_expiry_unix: IntGauge,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokensteward".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            acquisition_attempts: IntCounterVec::new(Opts::new("acquisition_attempts_total", "Token exchange attempts by strategy"), &["strategy"]).unwrap(),
            acquisition_failures: IntCounterVec::new(Opts::new("acquisition_failures_total", "Token exchange failures by strategy"), &["strategy"]).unwrap(),
            acquisition_duration: HistogramVec::new(HistogramOpts::new("acquisition_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0]), &["strategy"]).unwrap(),
            cache_hits: IntCounter::new("token_cache_hits_total", "Requests served from the token cache without I/O").unwrap(),

            renewal_successes: IntCounter::new("renewal_successes_total", "Proactive renewals that produced a token").unwrap(),
            renewal_failures: IntCounter::new("renewal_failures_total", "Proactive renewals that failed").unwrap(),

            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Cached token expiry timestamp").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.acquisition_attempts.clone())).unwrap();
        reg.register(Box::new(metrics.acquisition_failures.clone())).unwrap();
        reg.register(Box::new(metrics.acquisition_duration.clone())).unwrap();
        reg.register(Box::new(metrics.cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.renewal_successes.clone())).unwrap();
        reg.register(Box::new(metrics.renewal_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
