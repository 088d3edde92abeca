use serde::{Deserialize, Serialize};

/// Placeholder written into freshly created configs.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default station to use
    #[serde(default = "default_station_id")]
    pub default_station: String,

    /// Available LLM stations
    #[serde(default)]
    pub stations: Vec<Station>,

    /// Search provider settings (Bright Data)
    #[serde(default)]
    pub search: SearchConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Write debug logs to a file instead of stderr
    #[serde(default)]
    pub debug: bool,

    /// Debug log file or directory (defaults next to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_rotation: Option<DebugLogRotation>,

    /// Number of rotated log files to keep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_keep: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_station: default_station_id(),
            stations: vec![
                Station {
                    id: "gpt-4.1".to_string(),
                    name: "GPT-4.1".to_string(),
                    provider: Provider::OpenAI,
                    api_key: API_KEY_PLACEHOLDER.to_string(),
                    api_base: Some("https://api.openai.com".to_string()),
                    model: "gpt-4.1-2025-04-14".to_string(),
                    max_tokens: None,
                    temperature: None,
                },
                Station {
                    id: "claude".to_string(),
                    name: "Claude Sonnet".to_string(),
                    provider: Provider::Anthropic,
                    api_key: API_KEY_PLACEHOLDER.to_string(),
                    api_base: Some("https://api.anthropic.com".to_string()),
                    model: "claude-sonnet-4-20250514".to_string(),
                    max_tokens: Some(8192),
                    temperature: None,
                },
            ],
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            debug: false,
            debug_log_path: None,
            debug_log_rotation: None,
            debug_log_keep: None,
        }
    }
}

impl Config {
    /// Look up the station named by `default_station`.
    pub fn active_station(&self) -> Option<&Station> {
        self.station(&self.default_station)
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Fill missing credentials from the process environment.
    ///
    /// Only empty or placeholder keys are replaced; explicit keys in the
    /// config file win.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for station in &mut self.stations {
            if !is_unset(&station.api_key) {
                continue;
            }
            if let Some(key) = lookup(station.provider.api_key_env()).filter(|k| !k.is_empty()) {
                station.api_key = key;
            }
        }

        if is_unset(&self.search.api_key) {
            if let Some(key) = lookup("BRIGHTDATA_API_KEY").filter(|k| !k.is_empty()) {
                self.search.api_key = key;
            }
        }
    }
}

fn is_unset(key: &str) -> bool {
    key.trim().is_empty() || key == API_KEY_PLACEHOLDER
}

/// A "station" represents one LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Unique identifier for this station
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Provider type
    pub provider: Provider,

    /// API key
    pub api_key: String,

    /// Optional custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Model identifier
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }

    /// Environment variable consulted when the station has no key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Bright Data settings for SERP and Reddit collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Bright Data API token (falls back to BRIGHTDATA_API_KEY)
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// SERP API zone name
    #[serde(default = "default_serp_zone")]
    pub serp_zone: String,

    /// Dataset id for Reddit keyword discovery
    #[serde(default = "default_reddit_search_dataset")]
    pub reddit_search_dataset: String,

    /// Dataset id for Reddit post comment collection
    #[serde(default = "default_reddit_comments_dataset")]
    pub reddit_comments_dataset: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Organic results kept per SERP query
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Upper bound on Reddit threads chosen for a deep-dive
    #[serde(default = "default_max_selected_urls")]
    pub max_selected_urls: usize,

    #[serde(default = "default_comments_per_post")]
    pub comments_per_post: usize,

    /// How far back comment collection looks
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    /// HTTP timeout for a single provider request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            serp_zone: default_serp_zone(),
            reddit_search_dataset: default_reddit_search_dataset(),
            reddit_comments_dataset: default_reddit_comments_dataset(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            results_per_query: default_results_per_query(),
            max_selected_urls: default_max_selected_urls(),
            comments_per_post: default_comments_per_post(),
            days_back: default_days_back(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// How the debug log file is rotated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebugLogRotation {
    /// Single append-only file
    None,
    /// One file per day (tracing-appender rolling)
    Daily,
    /// One file per process start
    Session,
}

fn default_station_id() -> String {
    "gpt-4.1".to_string()
}

fn default_api_base() -> String {
    "https://api.brightdata.com".to_string()
}

fn default_serp_zone() -> String {
    "serp_api1".to_string()
}

fn default_reddit_search_dataset() -> String {
    "gd_lvz8ah06191smkebj4".to_string()
}

fn default_reddit_comments_dataset() -> String {
    "gd_lvzdpsdlw09j6t702".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_poll_attempts() -> u32 {
    60
}

fn default_results_per_query() -> usize {
    10
}

fn default_max_selected_urls() -> usize {
    5
}

fn default_comments_per_post() -> usize {
    10
}

fn default_days_back() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
default_station = "local"

[[stations]]
id = "local"
name = "Local vLLM"
provider = "openai"
api_key = "none"
api_base = "http://localhost:8001"
model = "qwen"
"#,
        )
        .unwrap();

        assert_eq!(config.active_station().unwrap().model, "qwen");
        assert_eq!(config.search.serp_zone, "serp_api1");
        assert_eq!(config.search.max_selected_urls, 5);
        assert_eq!(config.server.port, 8000);
        assert!(!config.debug);
    }

    #[test]
    fn env_overrides_only_fill_placeholder_keys() {
        let mut config = Config::default();
        config.stations[1].api_key = "sk-ant-explicit".to_string();

        config.apply_env_from(|name| match name {
            "OPENAI_API_KEY" => Some("sk-from-env".to_string()),
            "ANTHROPIC_API_KEY" => Some("sk-ant-from-env".to_string()),
            "BRIGHTDATA_API_KEY" => Some("bd-token".to_string()),
            _ => None,
        });

        assert_eq!(config.stations[0].api_key, "sk-from-env");
        assert_eq!(config.stations[1].api_key, "sk-ant-explicit");
        assert_eq!(config.search.api_key, "bd-token");
    }

    #[test]
    fn missing_env_leaves_placeholder_in_place() {
        let mut config = Config::default();
        config.apply_env_from(|_| None);
        assert_eq!(config.stations[0].api_key, API_KEY_PLACEHOLDER);
        assert!(config.search.api_key.is_empty());
    }
}
