use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::{Registry, Unit},
};
use tokio::time;

#[derive(Clone, Debug)]
pub struct HttpMetrics {
    requests: Family<Labels, Counter>,
    durations: Family<RouteLabels, Histogram>,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct Labels {
    route: &'static str,
    method: String,
    status: String,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct RouteLabels {
    route: &'static str,
}

// === impl HttpMetrics ===

impl HttpMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let requests = Family::<Labels, Counter>::default();
        reg.register(
            "http_requests",
            "Total number of HTTP requests handled by the API",
            requests.clone(),
        );

        let durations = Family::<RouteLabels, Histogram>::new_with_constructor(|| {
            // Each request issues a handful of Kubernetes API calls.
            Histogram::new([0.005, 0.025, 0.1, 0.5, 1.0, 5.0])
        });
        reg.register_with_unit(
            "http_request_duration",
            "Histogram of HTTP request handling latency (seconds)",
            Unit::Seconds,
            durations.clone(),
        );

        Self {
            requests,
            durations,
        }
    }

    pub(crate) fn record(
        &self,
        route: &'static str,
        method: &http::Method,
        status: http::StatusCode,
        start: time::Instant,
    ) {
        self.requests
            .get_or_create(&Labels {
                route,
                method: method.to_string(),
                status: status.as_u16().to_string(),
            })
            .inc();
        self.durations
            .get_or_create(&RouteLabels { route })
            .observe(start.elapsed().as_secs_f64());
    }

    #[cfg(test)]
    pub(crate) fn requests(&self, route: &'static str, method: &str, status: u16) -> u64 {
        self.requests
            .get_or_create(&Labels {
                route,
                method: method.to_string(),
                status: status.to_string(),
            })
            .get()
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::register(&mut Registry::default())
    }
}
