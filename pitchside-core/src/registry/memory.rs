#![forbid(unsafe_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use super::{validate_user_id, SubscriberStore};
use crate::event::Audience;
use crate::subscriber::{DeliveryAddress, Provider, Subscriber};
use crate::Result;

pub struct InMemorySubscriberStore {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySubscriberStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn upsert_channel(&self, user_id: &str, address: DeliveryAddress) -> Result<Subscriber> {
        validate_user_id(user_id)?;
        let mut subscribers = self.subscribers.write();
        let subscriber = subscribers
            .entry(user_id.to_string())
            .or_insert_with(|| Subscriber::new(user_id));
        subscriber.upsert_channel(address);
        Ok(subscriber.clone())
    }

    async fn remove_channel(&self, user_id: &str, provider: Provider) -> Result<()> {
        let mut subscribers = self.subscribers.write();
        if let Some(subscriber) = subscribers.get_mut(user_id) {
            subscriber.remove_channel(provider);
        }
        Ok(())
    }

    async fn resolve(&self, audience: &Audience) -> Result<Vec<(String, DeliveryAddress)>> {
        let subscribers = self.subscribers.read();
        let mut resolved = Vec::new();
        match audience {
            Audience::AllSubscribers => {
                for subscriber in subscribers.values() {
                    for channel in &subscriber.channels {
                        resolved.push((subscriber.user_id.clone(), channel.clone()));
                    }
                }
            }
            Audience::SpecificUsers { user_ids } => {
                let mut seen = HashSet::new();
                for user_id in user_ids {
                    if !seen.insert(user_id.as_str()) {
                        continue;
                    }
                    if let Some(subscriber) = subscribers.get(user_id) {
                        for channel in &subscriber.channels {
                            resolved.push((subscriber.user_id.clone(), channel.clone()));
                        }
                    }
                }
            }
        }
        Ok(resolved)
    }

    async fn revoke(&self, address: &DeliveryAddress) -> Result<usize> {
        let mut subscribers = self.subscribers.write();
        let mut removed = 0;
        for subscriber in subscribers.values_mut() {
            let len_before = subscriber.channels.len();
            subscriber.channels.retain(|c| c != address);
            if subscriber.channels.len() != len_before {
                removed += len_before - subscriber.channels.len();
                subscriber.updated_at = Utc::now();
            }
        }
        Ok(removed)
    }

    async fn get(&self, user_id: &str) -> Result<Option<Subscriber>> {
        let subscribers = self.subscribers.read();
        Ok(subscribers.get(user_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Subscriber>> {
        let subscribers = self.subscribers.read();
        Ok(subscribers.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use zeroize::Zeroizing;

    fn web_push(endpoint: &str) -> DeliveryAddress {
        DeliveryAddress::WebPush {
            endpoint: endpoint.into(),
            p256dh_key: "BNcW4oLJ".into(),
            auth_key: Zeroizing::new("c2VjcmV0".into()),
        }
    }

    fn fcm(token: &str) -> DeliveryAddress {
        DeliveryAddress::Fcm {
            token: token.into(),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_and_replaces() {
        let store = InMemorySubscriberStore::new();

        let sub = store
            .upsert_channel("p1", web_push("https://push.example/a"))
            .await
            .unwrap();
        assert_eq!(sub.channel_count(), 1);

        let sub = store
            .upsert_channel("p1", web_push("https://push.example/b"))
            .await
            .unwrap();
        assert_eq!(sub.channel_count(), 1);
        assert_eq!(
            sub.channel_for(Provider::WebPush).unwrap().key(),
            "https://push.example/b"
        );

        let resolved = store.resolve(&Audience::AllSubscribers).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1.key(), "https://push.example/b");
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_user_id() {
        let store = InMemorySubscriberStore::new();
        let err = store
            .upsert_channel("", fcm("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = store
            .upsert_channel("   ", fcm("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_channel_is_idempotent() {
        let store = InMemorySubscriberStore::new();
        store.upsert_channel("p1", fcm("tok-1")).await.unwrap();

        store.remove_channel("p1", Provider::Fcm).await.unwrap();
        store.remove_channel("p1", Provider::Fcm).await.unwrap();
        store.remove_channel("ghost", Provider::Fcm).await.unwrap();

        let sub = store.get("p1").await.unwrap().unwrap();
        assert_eq!(sub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_excludes_zero_channel_subscribers() {
        let store = InMemorySubscriberStore::new();
        store.upsert_channel("p1", fcm("tok-1")).await.unwrap();
        store.upsert_channel("p2", fcm("tok-2")).await.unwrap();
        store.remove_channel("p2", Provider::Fcm).await.unwrap();

        let resolved = store.resolve(&Audience::AllSubscribers).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "p1");
    }

    #[tokio::test]
    async fn test_resolve_specific_users() {
        let store = InMemorySubscriberStore::new();
        store.upsert_channel("p1", fcm("tok-1")).await.unwrap();
        store
            .upsert_channel("p1", web_push("https://push.example/p1"))
            .await
            .unwrap();
        store.upsert_channel("p2", fcm("tok-2")).await.unwrap();

        let resolved = store
            .resolve(&Audience::users(["p1", "ghost", "p1"]))
            .await
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|(user, _)| user == "p1"));
    }

    #[tokio::test]
    async fn test_revoke_removes_from_every_subscriber() {
        let store = InMemorySubscriberStore::new();
        let shared = fcm("family-tablet");
        store.upsert_channel("p1", shared.clone()).await.unwrap();
        store.upsert_channel("p2", shared.clone()).await.unwrap();
        store.upsert_channel("p2", web_push("https://push.example/p2")).await.unwrap();

        let removed = store.revoke(&shared).await.unwrap();
        assert_eq!(removed, 2);

        let resolved = store.resolve(&Audience::AllSubscribers).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "p2");
        assert_eq!(resolved[0].1.provider(), Provider::WebPush);

        assert_eq!(store.revoke(&shared).await.unwrap(), 0);
    }
}
