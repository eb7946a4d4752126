use async_trait::async_trait;
use serde::Serialize;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, URL_SAFE_NO_PAD, VapidSignatureBuilder,
    WebPushClient, WebPushError, WebPushMessageBuilder,
};

use super::DeliveryAdapter;
use crate::dispatch::types::DeliveryError;
use crate::event::NotificationEvent;
use crate::secrets::Credential;
use crate::subscriber::{DeliveryAddress, Provider};

const DEFAULT_TTL_SECS: u32 = 86400;

#[derive(Debug, Clone)]
pub struct WebPushConfig {
    /// URL-safe base64 VAPID private key, as produced by the usual
    /// `generate-vapid-keys` tooling.
    pub vapid_private_key: Credential,
    /// VAPID subject claim, a `mailto:` or `https:` contact URI.
    pub vapid_subject: String,
    /// How long the push service may hold an undelivered message.
    pub ttl_secs: u32,
}

impl WebPushConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            vapid_private_key: std::env::var("VAPID_PRIVATE_KEY").ok()?.into(),
            vapid_subject: std::env::var("VAPID_SUBJECT").ok()?,
            ttl_secs: std::env::var("WEB_PUSH_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECS),
        })
    }
}

/// Payload handed to the service worker, encrypted per RFC 8291.
#[derive(Serialize)]
struct PushPayload<'a> {
    title: &'a str,
    body: &'a str,
    icon: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

pub struct WebPushAdapter {
    config: WebPushConfig,
    client: HyperWebPushClient,
}

impl WebPushAdapter {
    pub fn new(config: WebPushConfig) -> Self {
        Self {
            config,
            client: HyperWebPushClient::new(),
        }
    }
}

#[async_trait]
impl DeliveryAdapter for WebPushAdapter {
    fn provider(&self) -> Provider {
        Provider::WebPush
    }

    async fn send(
        &self,
        event: &NotificationEvent,
        address: &DeliveryAddress,
    ) -> std::result::Result<(), DeliveryError> {
        let (endpoint, p256dh, auth) = match address {
            DeliveryAddress::WebPush {
                endpoint,
                p256dh_key,
                auth_key,
            } => (endpoint.as_str(), p256dh_key.as_str(), auth_key.as_str()),
            other => {
                return Err(DeliveryError::Permanent(format!(
                    "{} address handed to web push adapter",
                    other.provider()
                )))
            }
        };

        let subscription = SubscriptionInfo::new(endpoint, p256dh, auth);

        let payload = PushPayload {
            title: &event.title,
            body: &event.body,
            icon: &event.icon,
            tag: event.tag.as_deref(),
            link: event.link.as_deref(),
        };
        let content =
            serde_json::to_vec(&payload).map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let mut sig_builder = VapidSignatureBuilder::from_base64(
            self.config.vapid_private_key.expose(),
            URL_SAFE_NO_PAD,
            &subscription,
        )
        .map_err(|e| DeliveryError::NotConfigured(format!("invalid VAPID key: {}", e)))?;
        sig_builder.add_claim("sub", self.config.vapid_subject.as_str());
        let signature = sig_builder
            .build()
            .map_err(|e| DeliveryError::NotConfigured(format!("VAPID signing failed: {}", e)))?;

        let mut builder = WebPushMessageBuilder::new(&subscription);
        builder.set_payload(ContentEncoding::Aes128Gcm, &content);
        builder.set_ttl(self.config.ttl_secs);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(classify_web_push_error)?;

        self.client
            .send(message)
            .await
            .map_err(classify_web_push_error)
    }
}

fn classify_web_push_error(err: WebPushError) -> DeliveryError {
    let detail = err.to_string();
    match err {
        WebPushError::EndpointNotFound | WebPushError::EndpointNotValid => {
            DeliveryError::Permanent("subscription expired or revoked".into())
        }
        // The subscription data itself is unusable, no retry will fix it.
        WebPushError::InvalidUri
        | WebPushError::MissingCryptoKeys
        | WebPushError::InvalidCryptoKeys => DeliveryError::Permanent(detail),
        // A 401 rejects our VAPID credentials, not the address.
        WebPushError::Unauthorized => DeliveryError::NotConfigured(detail),
        _ => DeliveryError::Transient(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebPushConfig {
        WebPushConfig {
            vapid_private_key: "bm90LWEtcmVhbC1rZXk".into(),
            vapid_subject: "mailto:club@example.com".into(),
            ttl_secs: 60,
        }
    }

    #[tokio::test]
    async fn test_rejects_foreign_address() {
        let adapter = WebPushAdapter::new(config());
        let event = NotificationEvent::new("Matchday", "Kickoff at 19:00");
        let address = DeliveryAddress::Fcm {
            token: "token".into(),
        };

        let err = adapter.send(&event, &address).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Permanent(_)));
    }

    #[tokio::test]
    async fn test_garbage_vapid_key_does_not_condemn_the_address() {
        let adapter = WebPushAdapter::new(WebPushConfig {
            vapid_private_key: "!!! not base64 !!!".into(),
            ..config()
        });
        let event = NotificationEvent::new("Matchday", "Kickoff at 19:00");
        let address = DeliveryAddress::WebPush {
            endpoint: "https://push.example.com/sub/abc".into(),
            p256dh_key: "BNcRd_e".into(),
            auth_key: "tBHI".to_string().into(),
        };

        let err = adapter.send(&event, &address).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured(_)));
    }

    #[test]
    fn test_payload_omits_absent_fields() {
        let payload = PushPayload {
            title: "Matchday",
            body: "Kickoff at 19:00",
            icon: "/icons/icon-192x192.png",
            tag: None,
            link: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["title"], "Matchday");
        assert!(json.get("tag").is_none());
        assert!(json.get("link").is_none());
    }

    #[test]
    fn test_payload_carries_tag_and_link() {
        let payload = PushPayload {
            title: "Matchday",
            body: "Kickoff at 19:00",
            icon: "/icons/icon-192x192.png",
            tag: Some("matchday"),
            link: Some("/matches/42"),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["tag"], "matchday");
        assert_eq!(json["link"], "/matches/42");
    }

    #[test]
    fn test_error_classification() {
        let permanent = [
            WebPushError::EndpointNotFound,
            WebPushError::EndpointNotValid,
            WebPushError::InvalidUri,
            WebPushError::MissingCryptoKeys,
        ];
        for err in permanent {
            let detail = err.to_string();
            assert!(
                matches!(classify_web_push_error(err), DeliveryError::Permanent(_)),
                "expected permanent for {}",
                detail
            );
        }
        assert!(matches!(
            classify_web_push_error(WebPushError::Unauthorized),
            DeliveryError::NotConfigured(_)
        ));
        assert!(matches!(
            classify_web_push_error(WebPushError::PayloadTooLarge),
            DeliveryError::Transient(_)
        ));
    }
}
