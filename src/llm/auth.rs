// Databricks workspace authentication
//
// Credentials are resolved once at startup, in this order:
// 1. A named profile (DATABRICKS_CONFIG_PROFILE) from the Databricks config
//    file, with DATABRICKS_HOST / DATABRICKS_TOKEN taking precedence.
// 2. DATABRICKS_HOST plus DATABRICKS_TOKEN (personal access token).
// 3. DATABRICKS_HOST plus DATABRICKS_CLIENT_ID / DATABRICKS_CLIENT_SECRET
//    (OAuth machine-to-machine, what Databricks Apps inject).
// 4. The DEFAULT profile of the config file, if one exists.
// Anything else is a startup error.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ServingConfig;
use crate::types::{AppError, AppResult};

const DEFAULT_PROFILE: &str = "DEFAULT";
const CONFIG_FILE_NAME: &str = ".databrickscfg";
const OAUTH_SCOPE: &str = "all-apis";
// Refresh this long before the server-side expiry.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Clone, PartialEq)]
pub enum Credentials {
    Token(String),
    OAuth {
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => write!(f, "Token(***)"),
            Credentials::OAuth { client_id, .. } => {
                write!(f, "OAuth {{ client_id: {}, client_secret: *** }}", client_id)
            }
        }
    }
}

/// Host and credential fields read from one profile of the config file.
#[derive(Debug, Clone, Default, PartialEq)]
struct Profile {
    host: Option<String>,
    token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Authenticated view of one Databricks workspace.
pub struct WorkspaceAuth {
    client: Client,
    host: String,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl WorkspaceAuth {
    pub fn new(host: &str, credentials: Credentials) -> Self {
        Self {
            client: Client::new(),
            host: normalize_host(host),
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Resolve host and credentials from configuration and profile files.
    pub fn resolve(config: &ServingConfig) -> AppResult<Self> {
        let profile = match &config.profile {
            Some(name) => {
                let path = config_file_path(config)?;
                let profile = read_profile(&path, name)?;
                info!(profile = %name, path = %path.display(), "Using Databricks config profile");
                profile
            }
            None => Profile::default(),
        };

        let host = config
            .host
            .clone()
            .or(profile.host.clone())
            .or_else(|| default_profile(config).and_then(|p| p.host));
        let host = host.ok_or_else(|| {
            AppError::Config(
                "Databricks host is not configured. Set DATABRICKS_HOST or DATABRICKS_CONFIG_PROFILE."
                    .to_string(),
            )
        })?;

        let credentials = pick_credentials(config, &profile)
            .or_else(|| default_profile(config).and_then(|p| pick_credentials(config, &p)))
            .ok_or_else(|| {
                AppError::Config(
                    "No Databricks credentials found. Set DATABRICKS_TOKEN, or DATABRICKS_CLIENT_ID and DATABRICKS_CLIENT_SECRET."
                        .to_string(),
                )
            })?;

        let auth = Self::new(&host, credentials);
        info!(host = %auth.host, credentials = ?auth.credentials, "Databricks workspace configured");
        Ok(auth)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Bearer token for the next request, fetching an OAuth token when the
    /// cached one is missing or about to expire.
    pub async fn bearer_token(&self) -> AppResult<String> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::OAuth {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/oidc/v1/token", self.host);
        debug!(url = %url, "Requesting OAuth token");

        let response = self
            .client
            .post(&url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", OAUTH_SCOPE)])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("failed to parse token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_SLACK),
        });

        Ok(token.access_token)
    }
}

fn pick_credentials(config: &ServingConfig, profile: &Profile) -> Option<Credentials> {
    if let Some(token) = config.token.clone().or(profile.token.clone()) {
        return Some(Credentials::Token(token));
    }

    let client_id = config.client_id.clone().or(profile.client_id.clone())?;
    let client_secret = config.client_secret.clone().or(profile.client_secret.clone())?;
    Some(Credentials::OAuth {
        client_id,
        client_secret,
    })
}

fn default_profile(config: &ServingConfig) -> Option<Profile> {
    if config.profile.is_some() {
        return None;
    }
    let path = config_file_path(config).ok()?;
    if !path.exists() {
        return None;
    }
    read_profile(&path, DEFAULT_PROFILE).ok()
}

fn config_file_path(config: &ServingConfig) -> AppResult<PathBuf> {
    if let Some(path) = &config.config_file {
        return Ok(path.clone());
    }
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or_else(|| AppError::Config("Cannot locate home directory for .databrickscfg".to_string()))
}

fn read_profile(path: &Path, name: &str) -> AppResult<Profile> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path).format(::config::FileFormat::Ini))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    // Section and key names may come back lowercased depending on the parser.
    let get = |key: &str| {
        settings
            .get_string(&format!("{}.{}", name, key))
            .or_else(|_| settings.get_string(&format!("{}.{}", name.to_lowercase(), key)))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let profile = Profile {
        host: get("host"),
        token: get("token"),
        client_id: get("client_id"),
        client_secret: get("client_secret"),
    };

    if profile == Profile::default() {
        return Err(AppError::Config(format!(
            "Profile '{}' not found in {}",
            name,
            path.display()
        )));
    }

    Ok(profile)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
