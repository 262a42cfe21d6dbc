use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct ClientMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    token_refreshes: IntCounterVec,
    rate_limited: IntCounter,
}

impl ClientMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "admin_client_login_attempts_total",
                "Count of login attempts grouped by flow and outcome",
            ),
            &["flow", "outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let token_refreshes = IntCounterVec::new(
            Opts::new(
                "admin_client_token_refresh_total",
                "Count of access token refresh attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(token_refreshes.clone()))?;

        let rate_limited = IntCounter::new(
            "admin_client_rate_limited_total",
            "Responses rejected by the backend with 429",
        )?;
        registry.register(Box::new(rate_limited.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            token_refreshes,
            rate_limited,
        })
    }

    pub fn login_attempt(&self, flow: &str, outcome: &str) {
        self.login_attempts.with_label_values(&[flow, outcome]).inc();
    }

    pub fn token_refresh(&self, outcome: &str) {
        self.token_refreshes.with_label_values(&[outcome]).inc();
    }

    pub fn rate_limited(&self) {
        self.rate_limited.inc();
    }

    pub fn login_attempts(&self, flow: &str, outcome: &str) -> u64 {
        self.login_attempts.with_label_values(&[flow, outcome]).get()
    }

    pub fn token_refreshes(&self, outcome: &str) -> u64 {
        self.token_refreshes.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of every client metric.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_rendered_output() {
        let metrics = ClientMetrics::new().expect("metrics");
        metrics.login_attempt("kiosk", "locked");
        metrics.token_refresh("success");
        metrics.rate_limited();

        assert_eq!(metrics.login_attempts("kiosk", "locked"), 1);
        let text = metrics.render().expect("render");
        assert!(text.contains("admin_client_login_attempts_total{flow=\"kiosk\",outcome=\"locked\"} 1"));
        assert!(text.contains("admin_client_rate_limited_total 1"));
    }
}
