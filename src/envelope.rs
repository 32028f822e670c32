// Response envelopes and their typed per-endpoint outcomes
//
// The API is not uniform: auth and trip routes answer with
// `{ success, message?, data? }`, provider routes name the payload by key
// (`{ provider: .. }`) and report failures under `error`, registration
// helpers return bare objects. Each shape has its own decoder below.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Body of a non-401 response, handed back exactly as the server sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success { data: T, message: Option<String> },
    Failure { status: u16, message: String },
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success { .. })
    }

    pub fn data(self) -> Option<T> {
        match self {
            ApiOutcome::Success { data, .. } => Some(data),
            ApiOutcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiOutcome::Success { message, .. } => message.as_deref(),
            ApiOutcome::Failure { message, .. } => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success { data, message } => ApiOutcome::Success {
                data: f(data),
                message,
            },
            ApiOutcome::Failure { status, message } => ApiOutcome::Failure { status, message },
        }
    }
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn text(&self, field: &str) -> Option<String> {
        self.body
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    // Server-supplied failure text, whichever field the route uses
    pub fn failure_message(&self) -> String {
        self.text("message")
            .or_else(|| self.text("error"))
            .unwrap_or_else(|| format!("Request failed with status {}", self.status))
    }

    fn failure<T>(&self) -> ApiOutcome<T> {
        ApiOutcome::Failure {
            status: self.status,
            message: self.failure_message(),
        }
    }

    // False only when the body explicitly says `success: false`
    fn flagged_ok(&self) -> bool {
        self.body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Decode a `{ success, message?, data? }` envelope.
    ///
    /// A 2xx answer that still says `success: false` counts as a failure.
    pub fn into_envelope<T: DeserializeOwned>(self) -> Result<ApiOutcome<T>, ApiError> {
        if !self.is_success() || !self.flagged_ok() {
            return Ok(self.failure());
        }

        let message = self.text("message");
        let data = self.body.get("data").cloned().unwrap_or(Value::Null);
        let data = decode(data)?;
        Ok(ApiOutcome::Success { data, message })
    }

    /// Decode an answer where the payload sits under `key`, as provider and
    /// admin routes do. An explicit `success: false` is still a failure.
    pub fn into_keyed<T: DeserializeOwned>(self, key: &str) -> Result<ApiOutcome<T>, ApiError> {
        if !self.is_success() || !self.flagged_ok() {
            return Ok(self.failure());
        }

        let message = self.text("message");
        let data = self.body.get(key).cloned().unwrap_or(Value::Null);
        let data = decode(data)?;
        Ok(ApiOutcome::Success { data, message })
    }

    /// Decode the whole body as `T`.
    pub fn into_body<T: DeserializeOwned>(self) -> Result<ApiOutcome<T>, ApiError> {
        if !self.is_success() {
            return Ok(self.failure());
        }

        let message = self.text("message");
        let data = decode(self.body)?;
        Ok(ApiOutcome::Success { data, message })
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_envelope_success_and_flagged_failure() {
        let ok = ApiResponse {
            status: 200,
            body: json!({"success": true, "message": "ok", "data": {"name": "Hue"}}),
        };
        assert_eq!(
            ok.into_envelope::<Item>().unwrap(),
            ApiOutcome::Success {
                data: Item {
                    name: "Hue".to_string()
                },
                message: Some("ok".to_string()),
            }
        );

        let flagged = ApiResponse {
            status: 200,
            body: json!({"success": false, "message": "Email already exists"}),
        };
        assert_eq!(
            flagged.into_envelope::<Item>().unwrap(),
            ApiOutcome::Failure {
                status: 200,
                message: "Email already exists".to_string()
            }
        );
    }

    #[test]
    fn test_failure_message_fallbacks() {
        let provider_style = ApiResponse {
            status: 403,
            body: json!({"error": "Provider account not approved"}),
        };
        assert_eq!(provider_style.failure_message(), "Provider account not approved");

        let bare = ApiResponse {
            status: 502,
            body: Value::Null,
        };
        assert_eq!(bare.failure_message(), "Request failed with status 502");
    }

    #[test]
    fn test_keyed_payload_and_decode_error() {
        let response = ApiResponse {
            status: 200,
            body: json!({"service": {"name": "Mekong cruise"}, "message": "created"}),
        };
        let outcome = response.clone().into_keyed::<Item>("service").unwrap();
        assert_eq!(outcome.message(), Some("created"));
        assert_eq!(outcome.data().unwrap().name, "Mekong cruise");

        let wrong_key = response.into_keyed::<Item>("booking");
        assert!(matches!(wrong_key, Err(ApiError::Decode(_))));

        let flagged = ApiResponse {
            status: 200,
            body: json!({"success": false, "message": "Provider not found"}),
        };
        assert_eq!(
            flagged.into_keyed::<Item>("provider").unwrap(),
            ApiOutcome::Failure {
                status: 200,
                message: "Provider not found".to_string()
            }
        );
    }

    #[test]
    fn test_unit_payload_for_empty_data() {
        let deleted = ApiResponse {
            status: 200,
            body: json!({"success": true, "message": "Trip deleted"}),
        };
        let outcome = deleted.into_envelope::<()>().unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.map(|_| 1).data(), Some(1));
    }
}
