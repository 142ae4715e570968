use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_SAMPLE_ROWS: usize = 10;
pub const DEFAULT_PROMPT_PATH: &str = "metadata_prompt.txt";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub serving: ServingConfig,
    pub upload: UploadConfig,
    pub prompt: PromptConfig,
    pub history: HistoryConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Connection settings for the Databricks Model Serving endpoint.
#[derive(Clone, Deserialize)]
pub struct ServingConfig {
    /// Serving endpoint name; `None` is tolerated and reported in-chat
    pub endpoint: Option<String>,
    pub host: Option<String>,
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub profile: Option<String>,
    pub config_file: Option<PathBuf>,
    pub max_tokens: u32,
}

// Credentials stay out of the startup log line.
impl std::fmt::Debug for ServingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingConfig")
            .field("endpoint", &self.endpoint)
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("profile", &self.profile)
            .field("config_file", &self.config_file)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub sample_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Most recent messages forwarded to the model; `None` forwards everything
    pub max_messages: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds without a request before a session is discarded; 0 keeps
    /// sessions until they are deleted
    pub idle_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Option<std::time::Duration> {
        (self.idle_secs > 0).then(|| std::time::Duration::from_secs(self.idle_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset, the way a blank line in `.env` does.
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            server: ServerConfig {
                port: var("PORT")
                    .unwrap_or_else(|| "8050".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            },
            serving: ServingConfig {
                endpoint: var("DATABRICKS_SERVING_ENDPOINT"),
                host: var("DATABRICKS_HOST"),
                token: var("DATABRICKS_TOKEN"),
                client_id: var("DATABRICKS_CLIENT_ID"),
                client_secret: var("DATABRICKS_CLIENT_SECRET"),
                profile: var("DATABRICKS_CONFIG_PROFILE"),
                config_file: var("DATABRICKS_CONFIG_FILE").map(PathBuf::from),
                max_tokens: var("SERVING_MAX_TOKENS")
                    .map(|v| v.parse())
                    .transpose()
                    .context("SERVING_MAX_TOKENS must be a positive integer")?
                    .unwrap_or(DEFAULT_MAX_TOKENS),
            },
            upload: UploadConfig {
                max_bytes: var("MAX_UPLOAD_BYTES")
                    .map(|v| v.parse())
                    .transpose()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
                sample_rows: var("SAMPLE_ROWS")
                    .map(|v| v.parse())
                    .transpose()
                    .context("SAMPLE_ROWS must be a positive integer")?
                    .unwrap_or(DEFAULT_SAMPLE_ROWS),
            },
            prompt: PromptConfig {
                path: var("METADATA_PROMPT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPT_PATH)),
            },
            history: HistoryConfig {
                max_messages: var("HISTORY_MAX_MESSAGES")
                    .map(|v| v.parse())
                    .transpose()
                    .context("HISTORY_MAX_MESSAGES must be a message count")?,
            },
            session: SessionConfig {
                idle_secs: var("SESSION_IDLE_SECS")
                    .map(|v| v.parse())
                    .transpose()
                    .context("SESSION_IDLE_SECS must be a number of seconds")?
                    .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
            },
            logging: LoggingConfig {
                dir: var("LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.port, 8050);
        assert_eq!(config.serving.max_tokens, 2000);
        assert_eq!(config.upload.max_bytes, 104_857_600);
        assert_eq!(config.upload.sample_rows, 10);
        assert_eq!(config.prompt.path, PathBuf::from("metadata_prompt.txt"));
        assert!(config.serving.endpoint.is_none());
        assert!(config.history.max_messages.is_none());
        assert_eq!(
            config.session.idle_timeout(),
            Some(std::time::Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_zero_idle_timeout_disables_expiry() {
        let config = Config::from_lookup(lookup(&[("SESSION_IDLE_SECS", "0")])).unwrap();
        assert!(config.session.idle_timeout().is_none());
    }

    #[test]
    fn test_blank_endpoint_is_unset() {
        let config =
            Config::from_lookup(lookup(&[("DATABRICKS_SERVING_ENDPOINT", "  ")])).unwrap();
        assert!(config.serving.endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("DATABRICKS_SERVING_ENDPOINT", "claude-sonnet"),
            ("HISTORY_MAX_MESSAGES", "20"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.serving.endpoint.as_deref(), Some("claude-sonnet"));
        assert_eq!(config.history.max_messages, Some(20));
        assert_eq!(config.upload.max_bytes, 1024);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("SERVING_MAX_TOKENS", "lots")])).is_err());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = Config::from_lookup(lookup(&[("DATABRICKS_TOKEN", "dapi-secret")])).unwrap();
        let rendered = format!("{:?}", config.serving);
        assert!(!rendered.contains("dapi-secret"));
    }
}
