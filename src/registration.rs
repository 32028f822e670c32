// Self-service sign-up under `/registration`

use crate::client::{ApiClient, ApiRequest};
use crate::envelope::ApiOutcome;
use crate::error::ApiError;
use crate::http::Method;
use crate::models::UserProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFields {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessFields {
    pub company_name: String,
    pub business_type: String,
    pub business_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,
}

// Serialized flat, tagged by `userType`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "userType", rename_all = "lowercase")]
pub enum RegistrationData {
    Tourist {
        #[serde(flatten)]
        account: AccountFields,
    },
    Provider {
        #[serde(flatten)]
        account: AccountFields,
        #[serde(flatten)]
        business: BusinessFields,
    },
}

impl RegistrationData {
    pub fn account(&self) -> &AccountFields {
        match self {
            RegistrationData::Tourist { account } => account,
            RegistrationData::Provider { account, .. } => account,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegistrationResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmailAvailability {
    pub available: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct RegistrationApi {
    client: ApiClient,
}

impl RegistrationApi {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.scoped("/registration"),
        }
    }

    /// Create an account. Successful sign-ups answer with a token the caller
    /// can hand to `AuthService::store_token`.
    pub async fn register(
        &self,
        data: &RegistrationData,
    ) -> Result<ApiOutcome<RegistrationResponse>, ApiError> {
        let response = self.client.post("/register", data).await?;
        let status = response.status;
        let outcome = response.into_body::<RegistrationResponse>()?;

        // The body carries its own success flag; honour it on 2xx too
        Ok(match outcome {
            ApiOutcome::Success { data, .. } if !data.success => ApiOutcome::Failure {
                status,
                message: data.message,
            },
            other => other,
        })
    }

    pub async fn check_email_availability(
        &self,
        email: &str,
    ) -> Result<ApiOutcome<EmailAvailability>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/check-email").query("email", email);
        self.client.send(request).await?.into_body()
    }
}
