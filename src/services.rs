// One shared client, session and expiry hook wired into every feature module

use crate::admin::AdminApi;
use crate::auth::AuthService;
use crate::client::{ApiClient, SessionExpiredHandler};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::HttpTransport;
use crate::provider::ProviderApi;
use crate::registration::RegistrationApi;
use crate::session::{Session, TokenStore};
use crate::trips::{ActivityService, TripService};
use std::sync::Arc;

pub struct TravelApi {
    pub auth: AuthService,
    pub trips: TripService,
    pub activities: ActivityService,
    pub provider: ProviderApi,
    pub admin: AdminApi,
    pub registration: RegistrationApi,
    client: ApiClient,
}

impl TravelApi {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(Session::new(store, config.token_key.clone()));
        let client = ApiClient::new(&config, session, on_expired)?;
        Ok(Self::from_client(client, config))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Self {
        let session = Arc::new(Session::new(store, config.token_key.clone()));
        let client = ApiClient::with_transport(&config, transport, session, on_expired);
        Self::from_client(client, config)
    }

    fn from_client(client: ApiClient, config: ClientConfig) -> Self {
        Self {
            auth: AuthService::new(client.clone(), config),
            trips: TripService::new(client.clone()),
            activities: ActivityService::new(client.clone()),
            provider: ProviderApi::new(&client),
            admin: AdminApi::new(&client),
            registration: RegistrationApi::new(&client),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::http::mock_transport::MockTransport;
    use crate::session::{MemoryTokenStore, SessionState};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_modules_share_one_session() {
        let transport = Arc::new(MockTransport::new());
        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redirects);
        let api = TravelApi::with_transport(
            ClientConfig::default(),
            transport.clone(),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(move |_: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        transport.reply(
            200,
            json!({"success": true, "data": {
                "token": "provider-token",
                "user": {"id": "p1", "email": "p@x.vn", "role": "provider"}
            }}),
        );
        api.auth.login("p@x.vn", "pw", false).await.unwrap();

        transport.reply(200, json!({"services": []}));
        api.provider.services().await.unwrap();
        assert_eq!(
            transport.last_request().header("Authorization"),
            Some("Bearer provider-token")
        );

        // Provider account hitting an admin route with a revoked token
        transport.reply(401, json!({"error": "Token revoked"}));
        let result = api.admin.provider_stats().await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));

        assert_eq!(api.auth.state(), SessionState::Anonymous);
        assert!(api.session().token().unwrap().is_none());
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
        assert_eq!(api.client().stats().requests_sent, 3);
    }
}
