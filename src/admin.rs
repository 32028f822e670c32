// Admin dashboard routes under `/admin`

use crate::client::{ApiClient, ApiRequest};
use crate::envelope::ApiOutcome;
use crate::error::ApiError;
use crate::http::Method;
use crate::models::{Pagination, Role, Service, Trip, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatsPeriod {
    #[default]
    Day,
    Month,
    Year,
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatsPeriod::Day => "day",
            StatsPeriod::Month => "month",
            StatsPeriod::Year => "year",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleFilter {
    User,
    Provider,
    #[default]
    All,
}

impl fmt::Display for RoleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoleFilter::User => "user",
            RoleFilter::Provider => "provider",
            RoleFilter::All => "all",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

// One bucket of a login/registration time series
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StatPoint {
    #[serde(alias = "_id", alias = "date")]
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServicePage {
    pub services: Vec<Service>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TripPage {
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

// Provider counts by account status, plus sign-ups in the last 30 days
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub rejected: u64,
    #[serde(default)]
    pub recent_registrations: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalRequest<'a> {
    provider_id: &'a str,
    approve: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Clone)]
pub struct AdminApi {
    client: ApiClient,
}

impl AdminApi {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.scoped("/admin"),
        }
    }

    pub async fn login_stats(&self, period: StatsPeriod) -> Result<ApiOutcome<Vec<StatPoint>>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/login-stats").query("period", period);
        self.client.send(request).await?.into_envelope()
    }

    pub async fn registration_stats(
        &self,
        period: StatsPeriod,
        role: RoleFilter,
    ) -> Result<ApiOutcome<Vec<StatPoint>>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/registration-stats")
            .query("period", period)
            .query("role", role);
        self.client.send(request).await?.into_envelope()
    }

    pub async fn pending_providers(&self) -> Result<ApiOutcome<Vec<UserProfile>>, ApiError> {
        self.client
            .get("/pending-providers")
            .await?
            .into_keyed("providers")
    }

    /// Approve or reject a provider application. `reason` is shown to the
    /// applicant on rejection.
    pub async fn approve_provider(
        &self,
        provider_id: &str,
        approve: bool,
        reason: Option<&str>,
    ) -> Result<ApiOutcome<Value>, ApiError> {
        let body = ApprovalRequest {
            provider_id,
            approve,
            reason,
        };
        self.client
            .post("/approve-provider", &body)
            .await?
            .into_envelope()
    }

    pub async fn provider_stats(&self) -> Result<ApiOutcome<ProviderStats>, ApiError> {
        self.client.get("/provider-stats").await?.into_keyed("stats")
    }

    pub async fn provider_detail(&self, provider_id: &str) -> Result<ApiOutcome<UserProfile>, ApiError> {
        self.client
            .get(&format!("/provider/{}", provider_id))
            .await?
            .into_keyed("provider")
    }

    pub async fn users(&self, query: &UserQuery) -> Result<ApiOutcome<UserPage>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/users")
            .query_opt("page", query.page)
            .query_opt("limit", query.limit)
            .query_opt("role", query.role.as_deref())
            .query_opt("status", query.status.as_deref())
            .query_opt("search", query.search.as_deref());
        self.client.send(request).await?.into_envelope()
    }

    pub async fn user_detail(&self, user_id: &str) -> Result<ApiOutcome<UserProfile>, ApiError> {
        self.client
            .get(&format!("/users/{}", user_id))
            .await?
            .into_envelope()
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<ApiOutcome<UserProfile>, ApiError> {
        self.client
            .put(&format!("/users/{}", user_id), update)
            .await?
            .into_envelope()
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<ApiOutcome<()>, ApiError> {
        self.client
            .delete(&format!("/users/{}", user_id))
            .await?
            .into_envelope()
    }

    pub async fn block_user(
        &self,
        user_id: &str,
        block: bool,
        reason: Option<&str>,
    ) -> Result<ApiOutcome<Value>, ApiError> {
        let mut body = serde_json::json!({ "block": block });
        if let Some(reason) = reason {
            body["reason"] = Value::from(reason);
        }
        self.client
            .post(&format!("/users/{}/block", user_id), &body)
            .await?
            .into_envelope()
    }

    pub async fn services(
        &self,
        page: u32,
        limit: u32,
        provider_id: Option<&str>,
    ) -> Result<ApiOutcome<ServicePage>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/services")
            .query("page", page)
            .query("limit", limit)
            .query_opt("providerId", provider_id);
        self.client.send(request).await?.into_envelope()
    }

    pub async fn trips(
        &self,
        page: u32,
        limit: u32,
        user_id: Option<&str>,
    ) -> Result<ApiOutcome<TripPage>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/trips")
            .query("page", page)
            .query("limit", limit)
            .query_opt("userId", user_id);
        self.client.send(request).await?.into_envelope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IgnoreExpiry;
    use crate::config::ClientConfig;
    use crate::http::mock_transport::MockTransport;
    use crate::session::Session;
    use serde_json::json;
    use std::sync::Arc;

    fn admin_api() -> (AdminApi, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = ApiClient::with_transport(
            &ClientConfig::default(),
            transport.clone(),
            Arc::new(Session::in_memory()),
            Arc::new(IgnoreExpiry),
        );
        (AdminApi::new(&client), transport)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_stats_queries() {
        let (api, transport) = admin_api();
        transport
            .reply(200, json!({"success": true, "data": [{"_id": "2025-06-01", "count": 12}]}))
            .reply(200, json!({"success": true, "data": [{"date": "2025-06", "count": 40}]}));

        let logins = api.login_stats(StatsPeriod::Day).await.unwrap().data().unwrap();
        assert_eq!(logins[0].label, "2025-06-01");
        assert_eq!(transport.last_request().query, pairs(&[("period", "day")]));

        let signups = api
            .registration_stats(StatsPeriod::Month, RoleFilter::Provider)
            .await
            .unwrap()
            .data()
            .unwrap();
        assert_eq!(signups[0].count, 40);
        assert_eq!(
            transport.last_request().query,
            pairs(&[("period", "month"), ("role", "provider")])
        );
    }

    #[tokio::test]
    async fn test_user_filters_only_send_set_values() {
        let (api, transport) = admin_api();
        transport.reply(
            200,
            json!({"success": true, "data": {
                "users": [{"id": "u1", "email": "a@x.vn"}],
                "pagination": {"page": 2, "limit": 10, "total": 11, "pages": 2}
            }}),
        );

        let query = UserQuery {
            page: Some(2),
            limit: Some(10),
            search: Some("nguyen".to_string()),
            ..Default::default()
        };
        let page = api.users(&query).await.unwrap().data().unwrap();

        assert_eq!(page.pagination.unwrap().total_pages, 2);
        let sent = transport.last_request();
        assert_eq!(sent.url, "http://localhost:5000/api/admin/users");
        assert_eq!(
            sent.query,
            pairs(&[("page", "2"), ("limit", "10"), ("search", "nguyen")])
        );
    }

    #[tokio::test]
    async fn test_provider_approval_body() {
        let (api, transport) = admin_api();
        transport
            .reply(200, json!({"success": true, "message": "Provider approved"}))
            .reply(200, json!({"success": true, "message": "Provider rejected"}));

        api.approve_provider("p1", true, None).await.unwrap();
        assert_eq!(
            transport.last_body(),
            json!({"providerId": "p1", "approve": true})
        );

        let rejected = api
            .approve_provider("p2", false, Some("Missing business license"))
            .await
            .unwrap();
        assert_eq!(rejected.message(), Some("Provider rejected"));
        assert_eq!(transport.last_body()["reason"], "Missing business license");
    }

    #[tokio::test]
    async fn test_user_management_routes() {
        let (api, transport) = admin_api();
        transport
            .reply(200, json!({"success": true, "data": {"id": "u3", "email": "c@x.vn", "role": "admin"}}))
            .reply(200, json!({"success": true, "data": null}))
            .reply(200, json!({"success": true, "message": "User blocked"}))
            .reply(403, json!({"success": false, "message": "Cannot delete another admin"}));

        let update = UserUpdate {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let updated = api.update_user("u3", &update).await.unwrap().data().unwrap();
        assert!(updated.is_admin());
        assert_eq!(transport.last_body(), json!({"role": "admin"}));

        api.delete_user("u4").await.unwrap();
        assert!(transport.last_request().url.ends_with("/admin/users/u4"));

        api.block_user("u5", true, Some("spam")).await.unwrap();
        assert_eq!(transport.last_body(), json!({"block": true, "reason": "spam"}));

        let refused = api.delete_user("u6").await.unwrap();
        assert_eq!(refused.message(), Some("Cannot delete another admin"));
    }

    #[tokio::test]
    async fn test_paged_listings() {
        let (api, transport) = admin_api();
        transport
            .reply(200, json!({"success": true, "data": {"services": []}}))
            .reply(200, json!({"success": true, "data": {"trips": [], "pagination": {"page": 1, "limit": 20, "total": 0}}}));

        api.services(1, 20, Some("p1")).await.unwrap();
        assert_eq!(
            transport.last_request().query,
            pairs(&[("page", "1"), ("limit", "20"), ("providerId", "p1")])
        );

        let trips = api.trips(1, 20, None).await.unwrap().data().unwrap();
        assert!(trips.trips.is_empty());
        assert_eq!(
            transport.last_request().query,
            pairs(&[("page", "1"), ("limit", "20")])
        );
    }

    #[tokio::test]
    async fn test_provider_lookups_read_named_payloads() {
        let (api, transport) = admin_api();
        transport
            .reply(
                200,
                json!({"success": true, "stats": {
                    "total": 9, "active": 6, "pending": 2, "rejected": 1,
                    "recentRegistrations": 3
                }}),
            )
            .reply(
                200,
                json!({"success": true, "total": 1, "providers": [{
                    "_id": "p9", "email": "p@x.vn", "fullName": "Lan Tran",
                    "phone": "0900000000", "companyName": "Lan Travel",
                    "accountStatus": "pending", "createdAt": "2025-06-01T08:00:00",
                    "isEmailVerified": true
                }]}),
            )
            .reply(
                200,
                json!({"success": true, "provider": {
                    "_id": "p9", "email": "p@x.vn", "fullName": "Lan Tran",
                    "role": "provider", "accountStatus": "active",
                    "approvedAt": null, "servicesCount": 4, "bookingsCount": 12
                }}),
            )
            .reply(404, json!({"success": false, "message": "Không tìm thấy provider"}));

        let stats = api.provider_stats().await.unwrap().data().unwrap();
        assert_eq!(
            stats,
            ProviderStats {
                total: 9,
                active: 6,
                pending: 2,
                rejected: 1,
                recent_registrations: 3,
            }
        );

        let pending = api.pending_providers().await.unwrap().data().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "p9");
        assert_eq!(pending[0].name, "Lan Tran");
        assert_eq!(pending[0].account_status.as_deref(), Some("pending"));

        let detail = api.provider_detail("p9").await.unwrap().data().unwrap();
        assert!(detail.is_provider());
        assert_eq!(detail.account_status.as_deref(), Some("active"));
        assert!(transport.last_request().url.ends_with("/admin/provider/p9"));

        let missing = api.provider_detail("nope").await.unwrap();
        assert_eq!(missing.message(), Some("Không tìm thấy provider"));
    }
}
