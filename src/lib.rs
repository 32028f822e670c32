// Client library for the travel booking platform API

// Core: transport, session and the authenticated client
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod session;

// Domain records and per-feature endpoint wrappers
pub mod admin;
pub mod auth;
pub mod models;
pub mod provider;
pub mod registration;
pub mod services;
pub mod trips;

// Re-export key types for convenience
pub use auth::{AuthApi, AuthService};
pub use client::{ApiClient, ApiRequest, ClientStats, ExpiryBroadcast, SessionExpiredHandler};
pub use config::ClientConfig;
pub use envelope::{ApiOutcome, ApiResponse};
pub use error::{ApiError, AuthError, ConfigError, StoreError};
pub use http::{HttpTransport, Method, ReqwestTransport};
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionState, TokenStore};
pub use services::TravelApi;
