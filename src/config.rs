//! Configuration management for Sales Copilot.
//!
//! Configuration is read once at process start and passed by reference
//! into the tool registry and agent; nothing reads the environment after
//! startup. Environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `OPENROUTER_BASE_URL` - Optional. Defaults to `https://openrouter.ai/api/v1`.
//! - `DEFAULT_MODEL` - Optional. The LLM model to use.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MAX_TOOL_ITERATIONS` - Optional. Maximum model/tool round trips per
//!   chat turn. Defaults to `8`.
//! - `MONTHLY_SALES_URL`, `TOP_DISTRIBUTORS_URL`, `EMPLOYEE_DATA_URL`,
//!   `ORDER_HISTORY_URL` - Optional. Upstream data endpoints. An unset
//!   URL does not fail startup; the corresponding endpoint fails at call
//!   time with a configuration-error payload instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Upstream data API endpoints. Each is optional: a missing URL surfaces
/// as a per-call configuration error, never as a startup failure.
#[derive(Debug, Clone, Default)]
pub struct DataApiConfig {
    pub monthly_sales_url: Option<String>,

    pub top_distributors_url: Option<String>,

    pub employee_data_url: Option<String>,

    pub order_history_url: Option<String>,
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Base URL of the OpenRouter-compatible chat completions API
    pub llm_base_url: String,

    /// Default LLM model identifier (OpenRouter format)
    pub default_model: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum model/tool round trips for one chat turn
    pub max_tool_iterations: usize,

    /// Upstream data API endpoints
    pub data_api: DataApiConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let llm_base_url = std::env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string());

        let default_model = std::env::var("DEFAULT_MODEL")
            .unwrap_or_else(|_| "anthropic/claude-sonnet-4.5".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let max_tool_iterations = std::env::var("MAX_TOOL_ITERATIONS")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MAX_TOOL_ITERATIONS".to_string(), format!("{}", e))
            })?;

        let data_api = DataApiConfig {
            monthly_sales_url: std::env::var("MONTHLY_SALES_URL").ok(),
            top_distributors_url: std::env::var("TOP_DISTRIBUTORS_URL").ok(),
            employee_data_url: std::env::var("EMPLOYEE_DATA_URL").ok(),
            order_history_url: std::env::var("ORDER_HISTORY_URL").ok(),
        };

        Ok(Self {
            api_key,
            llm_base_url,
            default_model,
            host,
            port,
            max_tool_iterations,
            data_api,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            llm_base_url: "https://openrouter.ai/api/v1".to_string(),
            default_model,
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_tool_iterations: 8,
            data_api: DataApiConfig::default(),
        }
    }
}
