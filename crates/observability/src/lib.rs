use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    exact_topic_total: AtomicU64,
    category_total: AtomicU64,
    greeting_total: AtomicU64,
    scenario_fallback_total: AtomicU64,
    generic_fallback_total: AtomicU64,
    storage_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub exact_topic_total: u64,
    pub category_total: u64,
    pub greeting_total: u64,
    pub scenario_fallback_total: u64,
    pub generic_fallback_total: u64,
    pub storage_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("portal_requests_total").increment(1);
    }

    /// Counts one answered query under its route label.
    pub fn record_route(&self, route: &'static str) {
        let counter = match route {
            "exact_topic" => &self.exact_topic_total,
            "category" => &self.category_total,
            "greeting" => &self.greeting_total,
            "scenario_fallback" => &self.scenario_fallback_total,
            _ => &self.generic_fallback_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("portal_routes_total", "route" => route).increment(1);
    }

    pub fn inc_storage_failure(&self) {
        self.storage_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("portal_storage_failures_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            exact_topic_total: self.exact_topic_total.load(Ordering::Relaxed),
            category_total: self.category_total.load(Ordering::Relaxed),
            greeting_total: self.greeting_total.load(Ordering::Relaxed),
            scenario_fallback_total: self.scenario_fallback_total.load(Ordering::Relaxed),
            generic_fallback_total: self.generic_fallback_total.load(Ordering::Relaxed),
            storage_failures_total: self.storage_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,publicsphere_api=info,publicsphere_agents=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
