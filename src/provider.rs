// Provider self-service routes under `/provider`
//
// These routes wrap the payload in a named key (`provider`, `services`, ...)
// and report failures under `error`, so every call decodes with `into_keyed`.

use crate::client::ApiClient;
use crate::envelope::ApiOutcome;
use crate::error::ApiError;
use crate::models::{
    BankAccount, Booking, BookingStatus, BusinessType, Contact, DashboardStats, Pricing, Service,
    ServiceLocation, ServiceType, UserProfile, VnpayInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct BecomeProviderRequest {
    pub company_name: String,
    pub business_type: BusinessType,
    pub description: String,
    pub address: String,
    pub business_phone: String,
    pub business_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<BankAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnpay_info: Option<VnpayInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderInfoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<BankAccount>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProviderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_info: Option<ProviderInfoUpdate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ServiceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

// What `/become-provider` echoes back
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BecomeProviderData {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub provider: Option<UserProfile>,
}

#[derive(Clone)]
pub struct ProviderApi {
    client: ApiClient,
}

impl ProviderApi {
    // `client` is the shared root client; routes are scoped under /provider
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.scoped("/provider"),
        }
    }

    pub async fn become_provider(
        &self,
        request: &BecomeProviderRequest,
    ) -> Result<ApiOutcome<BecomeProviderData>, ApiError> {
        self.client
            .post("/become-provider", request)
            .await?
            .into_body()
    }

    pub async fn profile(&self) -> Result<ApiOutcome<UserProfile>, ApiError> {
        self.client.get("/profile").await?.into_keyed("provider")
    }

    pub async fn update_profile(
        &self,
        request: &UpdateProviderRequest,
    ) -> Result<ApiOutcome<UserProfile>, ApiError> {
        self.client
            .put("/profile", request)
            .await?
            .into_keyed("provider")
    }

    pub async fn dashboard(&self) -> Result<ApiOutcome<DashboardStats>, ApiError> {
        self.client.get("/dashboard").await?.into_keyed("dashboard")
    }

    pub async fn services(&self) -> Result<ApiOutcome<Vec<Service>>, ApiError> {
        self.client.get("/services").await?.into_keyed("services")
    }

    pub async fn create_service(&self, draft: &ServiceDraft) -> Result<ApiOutcome<Service>, ApiError> {
        self.client
            .post("/services", draft)
            .await?
            .into_keyed("service")
    }

    pub async fn update_service(
        &self,
        service_id: &str,
        draft: &ServiceDraft,
    ) -> Result<ApiOutcome<Service>, ApiError> {
        self.client
            .put(&format!("/services/{}", service_id), draft)
            .await?
            .into_keyed("service")
    }

    pub async fn delete_service(&self, service_id: &str) -> Result<ApiOutcome<()>, ApiError> {
        self.client
            .delete(&format!("/services/{}", service_id))
            .await?
            .into_body::<Value>()
            .map(|outcome| outcome.map(|_| ()))
    }

    pub async fn bookings(&self) -> Result<ApiOutcome<Vec<Booking>>, ApiError> {
        self.client.get("/bookings").await?.into_keyed("bookings")
    }

    pub async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<ApiOutcome<Booking>, ApiError> {
        self.client
            .put(
                &format!("/bookings/{}/status", booking_id),
                &serde_json::json!({ "status": status }),
            )
            .await?
            .into_keyed("booking")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IgnoreExpiry;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use crate::http::mock_transport::MockTransport;
    use crate::models::PaymentStatus;
    use crate::session::Session;
    use serde_json::json;
    use std::sync::Arc;

    fn provider_api() -> (ProviderApi, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = ApiClient::with_transport(
            &ClientConfig::default(),
            transport.clone(),
            Arc::new(Session::in_memory()),
            Arc::new(IgnoreExpiry),
        );
        (ProviderApi::new(&client), transport)
    }

    fn service_json() -> Value {
        json!({
            "_id": "s1",
            "name": "Hoi An lantern tour",
            "service_type": "tour",
            "provider_id": "p1",
            "description": "Evening walking tour",
            "category": "culture",
            "location": {"address": "Old Town", "city": "Hoi An", "country": "VN"},
            "pricing": {"base_price": 25.0, "currency": "USD", "price_type": "per_person"},
            "status": "active",
            "verified": true
        })
    }

    #[tokio::test]
    async fn test_dashboard_unwraps_named_key() {
        let (api, transport) = provider_api();
        transport.reply(
            200,
            json!({"dashboard": {
                "total_services": 4,
                "total_bookings": 31,
                "recent_bookings": 6,
                "provider_since": "2024-11-02",
                "account_status": "active"
            }}),
        );

        let stats = api.dashboard().await.unwrap().data().unwrap();

        assert_eq!(stats.total_bookings, 31);
        assert_eq!(
            transport.last_request().url,
            "http://localhost:5000/api/provider/dashboard"
        );
    }

    #[tokio::test]
    async fn test_failure_reads_error_field() {
        let (api, transport) = provider_api();
        transport.reply(403, json!({"error": "Provider account pending approval"}));

        let outcome = api.services().await.unwrap();

        assert_eq!(
            outcome,
            ApiOutcome::Failure {
                status: 403,
                message: "Provider account pending approval".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_service_lifecycle() {
        let (api, transport) = provider_api();
        transport
            .reply(201, json!({"service": service_json()}))
            .reply(200, json!({"service": service_json()}))
            .reply(200, json!({"message": "Service deleted"}));

        let draft = ServiceDraft {
            name: Some("Hoi An lantern tour".to_string()),
            service_type: Some(ServiceType::Tour),
            ..Default::default()
        };
        let created = api.create_service(&draft).await.unwrap().data().unwrap();
        assert_eq!(created.id, "s1");
        assert_eq!(
            transport.last_body(),
            json!({"name": "Hoi An lantern tour", "service_type": "tour"})
        );

        api.update_service("s1", &draft).await.unwrap();
        assert!(transport.last_request().url.ends_with("/provider/services/s1"));

        let deleted = api.delete_service("s1").await.unwrap();
        assert_eq!(deleted.message(), Some("Service deleted"));
    }

    #[tokio::test]
    async fn test_booking_status_update() {
        let (api, transport) = provider_api();
        transport.reply(
            200,
            json!({"booking": {
                "_id": "b1",
                "user_id": "u1",
                "service_id": "s1",
                "provider_id": "p1",
                "start_date": "2025-08-01",
                "end_date": "2025-08-03",
                "number_of_guests": 2,
                "total_amount": 120.0,
                "currency": "USD",
                "status": "confirmed",
                "payment_status": "paid"
            }}),
        );

        let booking = api
            .update_booking_status("b1", BookingStatus::Confirmed)
            .await
            .unwrap()
            .data()
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert_eq!(transport.last_body(), json!({"status": "confirmed"}));
        assert!(transport.last_request().url.ends_with("/provider/bookings/b1/status"));
    }

    #[tokio::test]
    async fn test_become_provider_sends_business_details() {
        let (api, transport) = provider_api();
        transport.reply(201, json!({"message": "Application submitted"}));

        let request = BecomeProviderRequest {
            company_name: "Saigon Wheels".to_string(),
            business_type: BusinessType::Transport,
            description: "Airport transfers".to_string(),
            address: "District 1".to_string(),
            business_phone: "+84 28 0000 0000".to_string(),
            business_email: "ops@saigonwheels.vn".to_string(),
            website: None,
            bank_account: None,
            vnpay_info: Some(VnpayInfo {
                merchant_id: "M123".to_string(),
            }),
        };
        let outcome = api.become_provider(&request).await.unwrap();

        assert_eq!(outcome.message(), Some("Application submitted"));
        let body = transport.last_body();
        assert_eq!(body["business_type"], "transport");
        assert!(body.get("website").is_none());
        assert_eq!(body["vnpay_info"]["merchant_id"], "M123");
    }

    #[tokio::test]
    async fn test_profile_update_and_decode_error() {
        let (api, transport) = provider_api();
        transport
            .reply(200, json!({"provider": {"_id": "p1", "email": "p@x.vn", "role": "provider"}}))
            .reply(200, json!({"provider": "not an object"}));

        let update = UpdateProviderRequest {
            phone: Some("0901".to_string()),
            ..Default::default()
        };
        let profile = api.update_profile(&update).await.unwrap().data().unwrap();
        assert!(profile.is_provider());
        assert_eq!(transport.last_body(), json!({"phone": "0901"}));

        assert!(matches!(api.profile().await, Err(ApiError::Decode(_))));
    }
}
