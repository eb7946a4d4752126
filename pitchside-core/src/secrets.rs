#![forbid(unsafe_code)]

//! Wrapper for provider credentials.
//!
//! VAPID private keys, REST API keys, and service account keys are held
//! as [`Credential`] so that `Debug` output and serialized configuration
//! carry a placeholder instead of the raw material. The only way to get
//! the secret back out is an explicit [`Credential::expose`] call at the
//! point of use.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const PLACEHOLDER: &str = "[REDACTED]";

#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// The raw secret, for handing to a provider client.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(PLACEHOLDER)
    }
}

/// Serializes as the placeholder; a config dump never round-trips the
/// secret. Deserialization accepts the real value.
impl Serialize for Credential {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(PLACEHOLDER)
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Credential::new)
    }
}
