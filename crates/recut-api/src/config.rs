//! API server configuration.

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket address to bind
    pub bind_addr: String,
    /// Allowed CORS origins; empty means same-origin only
    pub cors_origins: Vec<String>,
    /// Whether to expose a Prometheus endpoint at /metrics
    pub enable_metrics: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            cors_origins: Vec::new(),
            enable_metrics: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("RECUT_API_BIND")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            cors_origins: std::env::var("RECUT_API_CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            enable_metrics: std::env::var("RECUT_API_METRICS")
                .map(|s| s != "0" && s.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }
}
