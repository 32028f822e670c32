// Client configuration: where the API lives and how long sessions persist

use crate::error::ConfigError;
use anyhow::Context;
use chrono::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const AUTH_TOKEN_KEY: &str = "auth_token";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub login_path: String,
    pub token_key: String,
    pub session_ttl: Duration,
    pub remembered_session_ttl: Duration,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            token_key: AUTH_TOKEN_KEY.to_string(),
            session_ttl: Duration::days(1),
            remembered_session_ttl: Duration::days(30),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to the
    /// local development defaults.
    ///
    /// `TRAVEL_API_URL` wins over the legacy `REACT_APP_API_URL`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Same as `from_env`, reading variables through `lookup`
    pub(crate) fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("TRAVEL_API_URL").or_else(|| lookup("REACT_APP_API_URL")) {
            config.base_url = url;
        }

        if let Some(path) = lookup("TRAVEL_LOGIN_PATH") {
            config.login_path = path;
        }

        if let Some(days) = lookup("TRAVEL_SESSION_DAYS") {
            config.session_ttl = parse_days("TRAVEL_SESSION_DAYS", &days)?;
        }

        if let Some(days) = lookup("TRAVEL_REMEMBER_DAYS") {
            config.remembered_session_ttl = parse_days("TRAVEL_REMEMBER_DAYS", &days)?;
        }

        config.user_agent = lookup("TRAVEL_USER_AGENT");

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.session_ttl <= Duration::zero() {
            return Err(ConfigError::InvalidLifetime(format!(
                "session ttl must be positive, got {}s",
                self.session_ttl.num_seconds()
            )));
        }
        if self.remembered_session_ttl < self.session_ttl {
            return Err(ConfigError::InvalidLifetime(
                "remembered sessions cannot be shorter than regular ones".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ttl_for(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remembered_session_ttl
        } else {
            self.session_ttl
        }
    }

    // Join a relative API path onto the base URL
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

fn parse_days(name: &str, raw: &str) -> anyhow::Result<Duration> {
    let days: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name} is not a number: {raw}"))?;
    Ok(Duration::days(days))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
