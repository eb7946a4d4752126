use async_trait::async_trait;

use super::DeliveryAdapter;
use crate::dispatch::types::DeliveryError;
use crate::event::NotificationEvent;
use crate::subscriber::{DeliveryAddress, Provider};

/// Stand-in adapter that records the delivery instead of calling a push
/// provider. Registered for a provider in development when no credentials
/// are available.
pub struct LoggingAdapter {
    provider: Provider,
}

impl LoggingAdapter {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl DeliveryAdapter for LoggingAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn send(
        &self,
        event: &NotificationEvent,
        address: &DeliveryAddress,
    ) -> std::result::Result<(), DeliveryError> {
        tracing::info!(
            provider = %self.provider,
            address = %address.key(),
            title = %event.title,
            "notification delivered to log"
        );
        Ok(())
    }
}
