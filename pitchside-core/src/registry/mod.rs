#![forbid(unsafe_code)]

//! Subscription registry: the durable mapping from user to delivery
//! addresses, and the single source of truth for who can be reached and
//! how.

mod memory;
mod redb_store;

use async_trait::async_trait;

use crate::event::Audience;
use crate::subscriber::{DeliveryAddress, Provider, Subscriber};
use crate::{Error, Result};

pub use memory::InMemorySubscriberStore;
pub use redb_store::{RedbStorage, RedbSubscriberStore};

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Creates the subscriber on first use; replaces any existing channel
    /// for the address's provider. Mutations are visible to `resolve`
    /// calls made after this returns.
    async fn upsert_channel(&self, user_id: &str, address: DeliveryAddress) -> Result<Subscriber>;

    /// Idempotent; unknown users and absent channels are a no-op.
    async fn remove_channel(&self, user_id: &str, provider: Provider) -> Result<()>;

    /// Every (user id, address) pair reachable for the audience.
    /// Zero-channel subscribers contribute nothing; unknown ids in a
    /// specific audience are skipped. Ordering is unspecified.
    async fn resolve(&self, audience: &Audience) -> Result<Vec<(String, DeliveryAddress)>>;

    /// Removes the matching channel from every subscriber holding it.
    /// Returns the number of channels removed.
    async fn revoke(&self, address: &DeliveryAddress) -> Result<usize>;

    async fn get(&self, user_id: &str) -> Result<Option<Subscriber>>;

    async fn list(&self) -> Result<Vec<Subscriber>>;
}

pub(crate) fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidArgument("user id must not be empty".into()));
    }
    Ok(())
}
