//! Provider delivery adapters.
//!
//! One adapter per push provider. An adapter performs exactly one attempt
//! per call and classifies every failure as transient, permanent, or a
//! configuration problem; retry and revocation decisions belong to the
//! dispatcher.

mod fcm;
mod logging;
mod onesignal;
mod web_push;

pub use fcm::{FcmAdapter, FcmConfig};
pub use logging::LoggingAdapter;
pub use onesignal::{OneSignalAdapter, OneSignalConfig};
pub use self::web_push::{WebPushAdapter, WebPushConfig};

use async_trait::async_trait;

use crate::dispatch::types::DeliveryError;
use crate::event::NotificationEvent;
use crate::subscriber::{DeliveryAddress, Provider};

#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// One delivery attempt. Must not retry internally and must not panic
    /// on provider failure.
    async fn send(
        &self,
        event: &NotificationEvent,
        address: &DeliveryAddress,
    ) -> std::result::Result<(), DeliveryError>;
}
