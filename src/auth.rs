// Authentication endpoints and the session flows built on top of them

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::envelope::ApiOutcome;
use crate::error::{ApiError, AuthError};
use crate::models::UserProfile;
use crate::session::{Session, SessionState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
    remember_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginData {
    pub token: String,
    pub user: UserProfile,
    #[serde(default)]
    pub remember_me: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recaptcha_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RegisterData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProfileData {
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RecaptchaConfig {
    #[serde(rename = "siteKey")]
    pub site_key: String,
}

/// Thin wrappers over the `/auth/*` routes.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
        recaptcha_token: Option<&str>,
    ) -> Result<ApiOutcome<LoginData>, ApiError> {
        let body = LoginRequest {
            login: identifier,
            password,
            remember_me,
            recaptcha_token,
        };
        self.client.post("/auth/login", &body).await?.into_envelope()
    }

    // Same as login without the reCAPTCHA check
    pub async fn simple_login(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<ApiOutcome<LoginData>, ApiError> {
        let body = LoginRequest {
            login: identifier,
            password,
            remember_me,
            recaptcha_token: None,
        };
        self.client
            .post("/auth/simple-login", &body)
            .await?
            .into_envelope()
    }

    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<ApiOutcome<RegisterData>, ApiError> {
        self.client
            .post("/auth/register", request)
            .await?
            .into_envelope()
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiOutcome<()>, ApiError> {
        self.client
            .post("/auth/forgot-password", &serde_json::json!({ "email": email }))
            .await?
            .into_envelope()
    }

    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<ApiOutcome<()>, ApiError> {
        self.client
            .post(
                "/auth/reset-password",
                &serde_json::json!({ "token": token, "password": password }),
            )
            .await?
            .into_envelope()
    }

    pub async fn profile(&self) -> Result<ApiOutcome<ProfileData>, ApiError> {
        self.client.get("/auth/profile").await?.into_envelope()
    }

    pub async fn recaptcha_config(&self) -> Result<ApiOutcome<RecaptchaConfig>, ApiError> {
        self.client
            .get("/auth/recaptcha-config")
            .await?
            .into_envelope()
    }
}

/// Owner of the login / logout / startup-check flows for one session.
pub struct AuthService {
    api: AuthApi,
    session: Arc<Session>,
    config: ClientConfig,
}

impl AuthService {
    pub fn new(client: ApiClient, config: ClientConfig) -> Self {
        let session = Arc::clone(client.session());
        Self {
            api: AuthApi::new(client),
            session,
            config,
        }
    }

    pub fn api(&self) -> &AuthApi {
        &self.api
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.session.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    /// Log in through the simple-login route and persist the returned token.
    ///
    /// The token lives for the regular session lifetime, or the remembered
    /// one when the server confirms `remember_me`.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<UserProfile, AuthError> {
        let outcome = self.api.simple_login(identifier, password, remember_me).await;
        self.finish_login(outcome, remember_me)
    }

    pub async fn login_with_recaptcha(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
        recaptcha_token: &str,
    ) -> Result<UserProfile, AuthError> {
        let outcome = self
            .api
            .login(identifier, password, remember_me, Some(recaptcha_token))
            .await;
        self.finish_login(outcome, remember_me)
    }

    fn finish_login(
        &self,
        outcome: Result<ApiOutcome<LoginData>, ApiError>,
        requested_remember: bool,
    ) -> Result<UserProfile, AuthError> {
        match outcome {
            Ok(ApiOutcome::Success { data, .. }) => {
                let remember = data.remember_me.unwrap_or(requested_remember);
                let ttl = self.config.ttl_for(remember);
                self.session.establish(&data.token, data.user.clone(), ttl)?;
                Ok(data.user)
            }
            Ok(ApiOutcome::Failure { message, .. }) => {
                info!(reason = %message, "login rejected");
                Err(AuthError::Authentication(message))
            }
            Err(ApiError::Unauthorized { message }) => Err(AuthError::Authentication(message)),
            Err(err) => Err(AuthError::Api(err)),
        }
    }

    /// Submit a registration. Never touches the session; use `store_token`
    /// to adopt a token returned by the server.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterData, AuthError> {
        match self.api.register(request).await {
            Ok(ApiOutcome::Success { data, .. }) => Ok(data),
            Ok(ApiOutcome::Failure { message, .. }) => Err(AuthError::Validation(message)),
            Err(ApiError::Unauthorized { message }) => Err(AuthError::Validation(message)),
            Err(err) => Err(AuthError::Api(err)),
        }
    }

    pub fn store_token(
        &self,
        token: &str,
        profile: UserProfile,
        remember_me: bool,
    ) -> Result<(), AuthError> {
        let ttl = self.config.ttl_for(remember_me);
        self.session.establish(token, profile, ttl)?;
        Ok(())
    }

    pub fn logout(&self) {
        if let Err(err) = self.session.clear() {
            warn!(error = %err, "failed to remove persisted token during logout");
        }
        info!("logged out");
    }

    /// Resolve the session from the persisted token. Safe to call repeatedly.
    ///
    /// A logout or login that lands while the profile is in flight wins over
    /// the profile answer.
    pub async fn check_auth(&self) -> SessionState {
        let snapshot = self.session.snapshot();
        if snapshot.token.is_none() {
            self.session.mark_anonymous_if_current(snapshot.generation);
            return self.session.state();
        }

        match self.api.profile().await {
            Ok(ApiOutcome::Success { data, .. }) => {
                self.session
                    .update_profile_if_current(snapshot.generation, data.user);
            }
            Ok(ApiOutcome::Failure { status, message }) => {
                warn!(status, reason = %message, "profile check failed, discarding token");
                self.discard(snapshot.generation);
            }
            Err(err) => {
                warn!(error = %err, "profile check failed, discarding token");
                self.discard(snapshot.generation);
            }
        }
        self.session.state()
    }

    // Re-fetch the profile; failures leave the session as it was
    pub async fn refresh_user(&self) {
        let snapshot = self.session.snapshot();
        if snapshot.token.is_none() {
            return;
        }

        match self.api.profile().await {
            Ok(ApiOutcome::Success { data, .. }) => {
                self.session
                    .update_profile_if_current(snapshot.generation, data.user);
            }
            Ok(ApiOutcome::Failure { message, .. }) => {
                warn!(reason = %message, "failed to refresh user")
            }
            Err(err) => warn!(error = %err, "failed to refresh user"),
        }
    }

    // Drop the token the startup check was made with, not a newer one
    fn discard(&self, generation: u64) {
        if let Err(err) = self.session.invalidate(generation) {
            warn!(error = %err, "failed to remove persisted token");
        }
    }

    pub fn is_provider(&self) -> bool {
        self.user().map_or(false, |u| u.is_provider())
    }

    pub fn is_active_provider(&self) -> bool {
        self.user().map_or(false, |u| u.is_active_provider())
    }

    pub fn is_admin(&self) -> bool {
        self.user().map_or(false, |u| u.is_admin())
    }
}
