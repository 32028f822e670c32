// Authenticated HTTP client shared by every feature API module
//
// Attaches the session's bearer token to each outbound request and reacts to
// 401 answers by invalidating the session and firing the session-expired hook.
// No retries: every failure surfaces exactly once to the caller.

use crate::config::{join_url, ClientConfig};
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpTransport, Method, ReqwestTransport};
use crate::session::{Invalidation, Session};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

// Invoked once per 401 that invalidated the session; receives the login path
pub trait SessionExpiredHandler: Send + Sync + 'static {
    fn session_expired(&self, login_path: &str);
}

impl<F> SessionExpiredHandler for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn session_expired(&self, login_path: &str) {
        self(login_path)
    }
}

pub struct IgnoreExpiry;

impl SessionExpiredHandler for IgnoreExpiry {
    fn session_expired(&self, _login_path: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpired {
    pub redirect_to: String,
}

/// Fans session-expiry events out to any number of subscribers, e.g. a router.
#[derive(Clone)]
pub struct ExpiryBroadcast {
    sender: broadcast::Sender<SessionExpired>,
}

impl ExpiryBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionExpired> {
        self.sender.subscribe()
    }
}

impl SessionExpiredHandler for ExpiryBroadcast {
    fn session_expired(&self, login_path: &str) {
        // No subscribers is fine
        let _ = self.sender.send(SessionExpired {
            redirect_to: login_path.to_string(),
        });
    }
}

#[derive(Debug, Default)]
struct RequestCounters {
    sent: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    unauthorized: AtomicUsize,
    transport_errors: AtomicUsize,
    stale_unauthorized: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_unauthorized: usize,
    pub transport_errors: usize,
    pub stale_unauthorized: usize,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    login_path: String,
    transport: Arc<dyn HttpTransport>,
    session: Arc<Session>,
    on_expired: Arc<dyn SessionExpiredHandler>,
    counters: Arc<RequestCounters>,
}

impl ApiClient {
    /// Build a client that talks to the configured API over reqwest.
    pub fn new(
        config: &ClientConfig,
        session: Arc<Session>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.user_agent.as_deref())?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            session,
            on_expired,
        ))
    }

    pub fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
        session: Arc<Session>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            transport,
            session,
            on_expired,
            counters: Arc::new(RequestCounters::default()),
        }
    }

    /// Client rooted at a sub-path (e.g. `/provider`). Shares session,
    /// transport, expiry hook and counters with `self`.
    pub fn scoped(&self, prefix: &str) -> Self {
        Self {
            base_url: join_url(&self.base_url, prefix),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            requests_sent: self.counters.sent.load(Ordering::SeqCst),
            requests_succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            requests_failed: self.counters.failed.load(Ordering::SeqCst),
            requests_unauthorized: self.counters.unauthorized.load(Ordering::SeqCst),
            transport_errors: self.counters.transport_errors.load(Ordering::SeqCst),
            stale_unauthorized: self.counters.stale_unauthorized.load(Ordering::SeqCst),
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Get, path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Post, path).json(body)?)
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Put, path).json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Delete, path)).await
    }

    /// Dispatch a request with the current session token attached.
    ///
    /// Returns the parsed body for every status except 401. A 401 clears the
    /// session, notifies the expiry hook and then fails with `Unauthorized`,
    /// unless a newer login already replaced the session the request used.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let snapshot = self.session.snapshot();
        let url = join_url(&self.base_url, &request.path);

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &snapshot.token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let body = match &request.body {
            Some(value) => Some(Bytes::from(
                serde_json::to_vec(value).map_err(|e| ApiError::Encode(e.to_string()))?,
            )),
            None => None,
        };

        debug!(
            method = %request.method,
            url = %url,
            authenticated = snapshot.token.is_some(),
            "dispatching request"
        );

        self.counters.sent.fetch_add(1, Ordering::SeqCst);
        let response = self
            .transport
            .send(HttpRequest {
                method: request.method,
                url: url.clone(),
                query: request.query,
                headers,
                body,
            })
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.counters.transport_errors.fetch_add(1, Ordering::SeqCst);
                warn!(method = %request.method, url = %url, error = %err, "request failed without a response");
                return Err(err);
            }
        };

        let body = parse_body(&response.body);
        let response = ApiResponse {
            status: response.status,
            body,
        };

        if response.status == 401 {
            self.counters.unauthorized.fetch_add(1, Ordering::SeqCst);
            let message = response.failure_message();
            self.expire_session(snapshot.generation, &url);
            return Err(ApiError::Unauthorized { message });
        }

        if response.is_success() {
            self.counters.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            debug!(status = response.status, url = %url, "request rejected by server");
        }

        Ok(response)
    }

    fn expire_session(&self, generation: u64, url: &str) {
        match self.session.invalidate(generation) {
            Ok(Invalidation::Cleared) => {
                warn!(url = %url, redirect_to = %self.login_path, "session expired, token cleared");
                self.on_expired.session_expired(&self.login_path);
            }
            Ok(Invalidation::AlreadyCleared) => {
                debug!(url = %url, "401 after the session was already cleared");
                self.on_expired.session_expired(&self.login_path);
            }
            Ok(Invalidation::Superseded) => {
                self.counters.stale_unauthorized.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                // Token may linger on disk, but the in-memory session is gone
                warn!(error = %err, "failed to remove persisted token");
                self.on_expired.session_expired(&self.login_path);
            }
        }
    }
}

// Non-JSON bodies (proxy error pages and the like) come back as a string
fn parse_body(raw: &Bytes) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
}
