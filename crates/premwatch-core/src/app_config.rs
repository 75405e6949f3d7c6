use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide configuration. Built once at start-up and read-only afterwards.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub targets_path: PathBuf,
    pub data_dir: PathBuf,
    pub ai_enabled: bool,
    pub openai_api_key: Option<String>,
    pub ai_base_url: String,
    pub ai_model: String,
    pub ai_snippet_max_chars: usize,
    pub request_timeout_secs: u64,
    pub browser_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_targets: usize,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub max_pages: usize,
    /// Raw records below this confidence never reach the normalizer.
    pub confidence_floor: f64,
    /// Number of runs a blocked strategy is skipped for.
    pub cooldown_runs: u64,
    pub run_deadline_secs: Option<u64>,
    pub risk_weights_path: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("targets_path", &self.targets_path)
            .field("data_dir", &self.data_dir)
            .field("ai_enabled", &self.ai_enabled)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_model", &self.ai_model)
            .field("ai_snippet_max_chars", &self.ai_snippet_max_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_targets", &self.max_concurrent_targets)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("max_pages", &self.max_pages)
            .field("confidence_floor", &self.confidence_floor)
            .field("cooldown_runs", &self.cooldown_runs)
            .field("run_deadline_secs", &self.run_deadline_secs)
            .field("risk_weights_path", &self.risk_weights_path)
            .finish()
    }
}
