//! Function-style invocation envelope and response.

use serde::{Deserialize, Serialize};

/// Incoming invocation. `body` carries the serialized request object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvocationEvent {
    #[serde(default)]
    pub body: Option<String>,
}

impl InvocationEvent {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }
}

/// JSON payload returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResponseBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Status plus serialized [`ResponseBody`], mirroring the platform contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn new(status_code: u16, body: &ResponseBody) -> Self {
        // Serializing two plain strings cannot fail.
        let body = serde_json::to_string(body).unwrap_or_default();
        Self { status_code, body }
    }

    /// Decode the body back into a [`ResponseBody`].
    #[cfg(test)]
    pub fn parsed_body(&self) -> Result<ResponseBody, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_omits_missing_url() {
        let resp = InvocationResponse::new(
            500,
            &ResponseBody {
                message: "nope".into(),
                url: None,
            },
        );
        assert_eq!(resp.body, r#"{"message":"nope"}"#);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["statusCode"], 500);
    }

    #[test]
    fn event_without_body_deserializes() {
        let event: InvocationEvent = serde_json::from_str("{}").unwrap();
        assert!(event.body.is_none());
    }
}
