use async_trait::async_trait;

use super::DeliveryAdapter;
use crate::dispatch::types::DeliveryError;
use crate::event::NotificationEvent;
use crate::secrets::Credential;
use crate::subscriber::{DeliveryAddress, Provider};

const DEFAULT_API_URL: &str = "https://onesignal.com/api/v1/notifications";

#[derive(Debug, Clone)]
pub struct OneSignalConfig {
    pub app_id: String,
    pub rest_api_key: Credential,
    pub api_url: String,
}

impl OneSignalConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            app_id: std::env::var("ONESIGNAL_APP_ID").ok()?,
            rest_api_key: std::env::var("ONESIGNAL_REST_API_KEY").ok()?.into(),
            api_url: std::env::var("ONESIGNAL_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.into()),
        })
    }
}

pub struct OneSignalAdapter {
    config: OneSignalConfig,
    client: reqwest::Client,
}

impl OneSignalAdapter {
    pub fn new(config: OneSignalConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeliveryAdapter for OneSignalAdapter {
    fn provider(&self) -> Provider {
        Provider::OneSignal
    }

    async fn send(
        &self,
        event: &NotificationEvent,
        address: &DeliveryAddress,
    ) -> std::result::Result<(), DeliveryError> {
        let player_id = match address {
            DeliveryAddress::OneSignal { player_id } => player_id,
            other => {
                return Err(DeliveryError::Permanent(format!(
                    "{} address handed to OneSignal adapter",
                    other.provider()
                )))
            }
        };

        let mut payload = serde_json::json!({
            "app_id": self.config.app_id,
            "include_player_ids": [player_id],
            "headings": {"en": event.title},
            "contents": {"en": event.body},
            "chrome_web_icon": event.icon,
        });
        if let Some(link) = &event.link {
            payload["url"] = serde_json::json!(link);
        }
        if let Some(tag) = &event.tag {
            payload["web_push_topic"] = serde_json::json!(tag);
        }

        let response = self
            .client
            .post(&self.config.api_url)
            .header(
                "Authorization",
                format!("Basic {}", self.config.rest_api_key.expose()),
            )
            .json(&payload)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(
                status,
                format!("OneSignal error: {}", status),
            ));
        }

        // OneSignal reports dead player ids inside a 200 response.
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;
        if let Some(errors) = body_errors(&body) {
            return Err(DeliveryError::Permanent(format!(
                "OneSignal rejected: {}",
                errors
            )));
        }

        Ok(())
    }
}

fn classify_status(status: reqwest::StatusCode, detail: String) -> DeliveryError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        DeliveryError::NotConfigured(detail)
    } else {
        DeliveryError::Transient(detail)
    }
}

/// Errors embedded in the response body, either an array of messages or an
/// object such as `{"invalid_player_ids": [...]}`.
fn body_errors(body: &serde_json::Value) -> Option<String> {
    let errors = body.get("errors")?;
    match errors {
        serde_json::Value::Array(list) if !list.is_empty() => Some(
            list.iter()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        serde_json::Value::Object(map) if !map.is_empty() => Some(errors.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OneSignalConfig {
        OneSignalConfig {
            app_id: "app".into(),
            rest_api_key: "key".into(),
            api_url: DEFAULT_API_URL.into(),
        }
    }

    #[tokio::test]
    async fn test_rejects_foreign_address() {
        let adapter = OneSignalAdapter::new(config());
        let event = NotificationEvent::new("Matchday", "Kickoff at 19:00");
        let address = DeliveryAddress::Fcm {
            token: "token".into(),
        };

        let err = adapter.send(&event, &address).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Permanent(_)));
    }

    #[test]
    fn test_status_classification() {
        let transient = [400, 404, 429, 500, 502, 503];
        for code in transient {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert!(
                classify_status(status, String::new()).is_transient(),
                "{} should be transient",
                code
            );
        }

        // Rejected REST credentials must not read as address death.
        let not_configured = [401, 403];
        for code in not_configured {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                classify_status(status, String::new()),
                DeliveryError::NotConfigured(_)
            ));
        }
    }

    #[test]
    fn test_body_errors_array() {
        let body = serde_json::json!({
            "id": "",
            "errors": ["All included players are not subscribed"]
        });
        let errors = body_errors(&body).unwrap();
        assert!(errors.contains("not subscribed"));
    }

    #[test]
    fn test_body_errors_invalid_player_ids() {
        let body = serde_json::json!({
            "errors": {"invalid_player_ids": ["b186912c"]}
        });
        let errors = body_errors(&body).unwrap();
        assert!(errors.contains("invalid_player_ids"));
    }

    #[test]
    fn test_body_without_errors() {
        assert!(body_errors(&serde_json::json!({"id": "abc123"})).is_none());
        assert!(body_errors(&serde_json::json!({"errors": []})).is_none());
    }
}
