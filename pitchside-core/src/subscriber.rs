#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    WebPush,
    #[serde(rename = "onesignal")]
    OneSignal,
    Fcm,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::WebPush => "web_push",
            Provider::OneSignal => "onesignal",
            Provider::Fcm => "fcm",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web_push" => Ok(Provider::WebPush),
            "onesignal" => Ok(Provider::OneSignal),
            "fcm" => Ok(Provider::Fcm),
            other => Err(Error::InvalidArgument(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// One delivery path for one subscriber. Identity is (provider, primary
/// key); key material on a web push subscription does not participate in
/// equality, so a re-registration with fresh keys still replaces the old
/// channel.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryAddress {
    WebPush {
        endpoint: String,
        p256dh_key: String,
        auth_key: Zeroizing<String>,
    },
    #[serde(rename = "onesignal")]
    OneSignal { player_id: String },
    Fcm { token: String },
}

impl DeliveryAddress {
    pub fn provider(&self) -> Provider {
        match self {
            DeliveryAddress::WebPush { .. } => Provider::WebPush,
            DeliveryAddress::OneSignal { .. } => Provider::OneSignal,
            DeliveryAddress::Fcm { .. } => Provider::Fcm,
        }
    }

    /// The provider-scoped primary key: push endpoint, player id, or token.
    pub fn key(&self) -> &str {
        match self {
            DeliveryAddress::WebPush { endpoint, .. } => endpoint,
            DeliveryAddress::OneSignal { player_id } => player_id,
            DeliveryAddress::Fcm { token } => token,
        }
    }
}

impl PartialEq for DeliveryAddress {
    fn eq(&self, other: &Self) -> bool {
        self.provider() == other.provider() && self.key() == other.key()
    }
}

impl Eq for DeliveryAddress {}

impl Hash for DeliveryAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider().hash(state);
        self.key().hash(state);
    }
}

impl fmt::Debug for DeliveryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebPush {
                endpoint,
                p256dh_key,
                ..
            } => f
                .debug_struct("WebPush")
                .field("endpoint", endpoint)
                .field("p256dh_key", p256dh_key)
                .field("auth_key", &"[REDACTED]")
                .finish(),
            Self::OneSignal { player_id } => f
                .debug_struct("OneSignal")
                .field("player_id", player_id)
                .finish(),
            Self::Fcm { token } => f.debug_struct("Fcm").field("token", token).finish(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: String,
    pub channels: Vec<DeliveryAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            channels: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn channel_for(&self, provider: Provider) -> Option<&DeliveryAddress> {
        self.channels.iter().find(|c| c.provider() == provider)
    }

    /// Replaces any existing channel for the address's provider. At most
    /// one channel per provider is kept.
    pub fn upsert_channel(&mut self, address: DeliveryAddress) {
        self.channels.retain(|c| c.provider() != address.provider());
        self.channels.push(address);
        self.updated_at = Utc::now();
    }

    pub fn remove_channel(&mut self, provider: Provider) -> bool {
        let len_before = self.channels.len();
        self.channels.retain(|c| c.provider() != provider);
        if self.channels.len() != len_before {
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
