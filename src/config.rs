use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Kubeconfig context to use. Falls back to in-cluster / current-context inference.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Items requested per list page (continue-token pagination).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            context: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> u32 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Deadline for a whole request when the caller does not pass `timeoutMs`.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Upper bound for a caller-supplied `timeoutMs`.
    #[serde(default = "default_max_request_timeout_ms")]
    pub max_request_timeout_ms: u64,
    /// Budget for each related section (events, pods, services), capped by the request deadline.
    #[serde(default = "default_section_timeout_ms")]
    pub section_timeout_ms: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_request_timeout_ms: default_max_request_timeout_ms(),
            section_timeout_ms: default_section_timeout_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_max_request_timeout_ms() -> u64 {
    60_000
}

fn default_section_timeout_ms() -> u64 {
    10_000
}

impl AggregationConfig {
    /// Request budget for an optional caller-supplied timeout, clamped to the configured maximum.
    pub fn request_budget(&self, requested_ms: Option<u64>) -> Duration {
        let ms = requested_ms
            .unwrap_or(self.request_timeout_ms)
            .min(self.max_request_timeout_ms);
        Duration::from_millis(ms)
    }

    pub fn section_budget(&self) -> Duration {
        Duration::from_millis(self.section_timeout_ms)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        if let Some(context) = &self.cluster.context {
            anyhow::ensure!(
                !context.is_empty(),
                "cluster.context must be non-empty when set"
            );
        }
        anyhow::ensure!(
            self.cluster.connect_timeout_ms > 0,
            "cluster.connect_timeout_ms must be > 0, got {}",
            self.cluster.connect_timeout_ms
        );
        anyhow::ensure!(
            self.cluster.read_timeout_ms > 0,
            "cluster.read_timeout_ms must be > 0, got {}",
            self.cluster.read_timeout_ms
        );
        anyhow::ensure!(
            self.cluster.page_size > 0,
            "cluster.page_size must be > 0, got {}",
            self.cluster.page_size
        );
        anyhow::ensure!(
            self.aggregation.request_timeout_ms > 0,
            "aggregation.request_timeout_ms must be > 0, got {}",
            self.aggregation.request_timeout_ms
        );
        anyhow::ensure!(
            self.aggregation.section_timeout_ms > 0,
            "aggregation.section_timeout_ms must be > 0, got {}",
            self.aggregation.section_timeout_ms
        );
        anyhow::ensure!(
            self.aggregation.max_request_timeout_ms >= self.aggregation.request_timeout_ms,
            "aggregation.max_request_timeout_ms ({}) must be >= aggregation.request_timeout_ms ({})",
            self.aggregation.max_request_timeout_ms,
            self.aggregation.request_timeout_ms
        );
        Ok(())
    }
}
