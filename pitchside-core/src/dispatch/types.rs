#![forbid(unsafe_code)]

//! Delivery outcome and dispatch report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscriber::DeliveryAddress;

/// Error from a single delivery attempt.
///
/// Adapters classify every provider failure and never retry internally.
/// Transient errors may succeed on a later dispatch; permanent errors mean
/// the address is dead and should be dropped from the registry. Absent or
/// rejected credentials are `NotConfigured`: counted like a permanent
/// failure, but never grounds for dropping an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    NotConfigured(String),
    Transient(String),
    Permanent(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured(reason) => write!(f, "provider not configured: {}", reason),
            Self::Transient(msg) => write!(f, "transient delivery error: {}", msg),
            Self::Permanent(msg) => write!(f, "permanent delivery error: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Terminal state of one delivery attempt within a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    TransientFailure { reason: String },
    PermanentFailure { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub user_id: String,
    pub address: DeliveryAddress,
    pub outcome: DeliveryOutcome,
}

/// Aggregate result of one dispatch, always produced even when every
/// attempt failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub transient_failures: usize,
    pub permanent_failures: Vec<DeliveryAddress>,
}

/// Per-dispatch summary kept in the dispatch log for the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: Uuid,
    pub title: String,
    pub tag: Option<String>,
    pub attempted: usize,
    pub delivered: usize,
    pub transient_failures: usize,
    pub permanent_failures: usize,
    pub dispatched_at: DateTime<Utc>,
    pub duration_ms: u64,
}
