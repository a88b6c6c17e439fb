use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, honouring `RUST_LOG` and falling back to `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second init (tests, embedded use) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Clone)]
pub struct ServiceMetrics {
    pub registry: Registry,
    pub http_errors_total: IntCounterVec,
    pub orders_placed_total: IntCounter,
    pub order_status_transitions_total: IntCounterVec,
    pub stats_update_failures_total: IntCounter,
    pub logins_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let http_errors_total = IntCounterVec::new(
            prometheus::Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)"
            ),
            &["service", "code", "status"]
        ).unwrap();
        let orders_placed_total = IntCounter::new(
            "orders_placed_total",
            "Orders accepted after a successful balance debit",
        ).unwrap();
        let order_status_transitions_total = IntCounterVec::new(
            prometheus::Opts::new(
                "order_status_transitions_total",
                "Order status advances, labelled by the state reached"
            ),
            &["to"]
        ).unwrap();
        let stats_update_failures_total = IntCounter::new(
            "stats_update_failures_total",
            "Best-effort revenue stats updates that failed after an order was placed",
        ).unwrap();
        let logins_total = IntCounterVec::new(
            prometheus::Opts::new("logins_total", "Login attempts by outcome"),
            &["outcome"]
        ).unwrap();
        let _ = registry.register(Box::new(http_errors_total.clone()));
        let _ = registry.register(Box::new(orders_placed_total.clone()));
        let _ = registry.register(Box::new(order_status_transitions_total.clone()));
        let _ = registry.register(Box::new(stats_update_failures_total.clone()));
        let _ = registry.register(Box::new(logins_total.clone()));
        ServiceMetrics { registry, http_errors_total, orders_placed_total, order_status_transitions_total, stats_update_failures_total, logins_total }
    }

    /// Prometheus text exposition of every registered family.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self { Self::new() }
}
