use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Upstream calls are allowed this long before they count as timed out.
pub const DEFAULT_WORKFLOW_TIMEOUT_SECS: u64 = 300;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct CourseConfig {
    pub common: core_config::Config,
    pub workflow: WorkflowSettings,
    pub cors: CorsSettings,
    pub observability: ObservabilitySettings,
}

/// Connection settings for the upstream workflow engine.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
    /// Flow that turns textbook content into a course outline.
    pub outline_flow_id: String,
    /// Flow that expands one outline module into teaching material.
    pub detail_flow_id: String,
    pub timeout: Duration,
}

impl WorkflowSettings {
    /// `Authorization` credential in the `key:secret` form the engine expects.
    pub fn bearer_credential(&self) -> String {
        format!(
            "{}:{}",
            self.api_key.expose_secret(),
            self.api_secret.expose_secret()
        )
    }
}

#[derive(Debug, Clone)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ObservabilitySettings {
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
}

impl CourseConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_env(common_config)
    }

    /// Read service settings from the process environment.
    ///
    /// Absent credentials are not an error here: the service starts degraded
    /// and reports them through [`CourseConfig::missing_required`]. Values
    /// that are present but malformed are rejected.
    ///
    /// Deployments configured with the older variable names (`XINGCHEN_API_*`,
    /// `WORKFLOW_1_ID`, `WORKFLOW_2_ID`, `BACKEND_PORT`) still load; the
    /// current name wins when both are set.
    pub fn from_env(mut common: core_config::Config) -> Result<Self, AppError> {
        if env::var("APP__PORT").is_err() {
            if let Some(port) = get_env_parsed_opt("BACKEND_PORT")? {
                common.port = port;
            }
        }

        Ok(CourseConfig {
            common,
            workflow: WorkflowSettings {
                api_url: get_env_or_legacy("WORKFLOW_API_URL", "XINGCHEN_API_URL"),
                api_key: Secret::new(get_env_or_legacy("WORKFLOW_API_KEY", "XINGCHEN_API_KEY")),
                api_secret: Secret::new(get_env_or_legacy(
                    "WORKFLOW_API_SECRET",
                    "XINGCHEN_API_SECRET",
                )),
                outline_flow_id: get_env_or_legacy("OUTLINE_FLOW_ID", "WORKFLOW_1_ID"),
                detail_flow_id: get_env_or_legacy("DETAIL_FLOW_ID", "WORKFLOW_2_ID"),
                timeout: Duration::from_secs(get_env_parsed(
                    "WORKFLOW_TIMEOUT_SECS",
                    DEFAULT_WORKFLOW_TIMEOUT_SECS,
                )?),
            },
            cors: CorsSettings {
                allowed_origins: parse_origins(&get_env("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            },
            observability: ObservabilitySettings {
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
                log_level: get_env("LOG_LEVEL", "info"),
            },
        })
    }

    /// Names of required settings that are empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let required = [
            ("WORKFLOW_API_URL", self.workflow.api_url.as_str()),
            ("WORKFLOW_API_KEY", self.workflow.api_key.expose_secret().as_str()),
            (
                "WORKFLOW_API_SECRET",
                self.workflow.api_secret.expose_secret().as_str(),
            ),
            ("OUTLINE_FLOW_ID", self.workflow.outline_flow_id.as_str()),
        ];

        required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.missing_required().is_empty()
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_or_legacy(key: &str, legacy_key: &str) -> String {
    env::var(key)
        .or_else(|_| env::var(legacy_key))
        .unwrap_or_default()
}

fn get_env_parsed<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_env_parsed_opt(key)?.unwrap_or(default))
}

fn get_env_parsed_opt<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
        }),
        Err(_) => Ok(None),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
