#![forbid(unsafe_code)]

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::{validate_user_id, SubscriberStore};
use crate::event::Audience;
use crate::subscriber::{DeliveryAddress, Provider, Subscriber};
use crate::{Error, Result};

const SUBSCRIBERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("subscribers");

pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(|e| Error::Storage(e.to_string()))?;

        {
            let wtxn = db
                .begin_write()
                .map_err(|e| Error::Storage(e.to_string()))?;
            wtxn.open_table(SUBSCRIBERS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;
            wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    pub fn subscriber_store(&self) -> RedbSubscriberStore {
        RedbSubscriberStore {
            db: Arc::clone(&self.db),
        }
    }
}

pub struct RedbSubscriberStore {
    db: Arc<Database>,
}

#[async_trait]
impl SubscriberStore for RedbSubscriberStore {
    async fn upsert_channel(&self, user_id: &str, address: DeliveryAddress) -> Result<Subscriber> {
        validate_user_id(user_id)?;
        let wtxn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        let subscriber = {
            let mut table = wtxn
                .open_table(SUBSCRIBERS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;

            let mut subscriber = {
                let existing = table
                    .get(user_id)
                    .map_err(|e| Error::Storage(e.to_string()))?;
                match existing {
                    Some(value) => serde_json::from_slice(value.value())
                        .map_err(|e| Error::Storage(e.to_string()))?,
                    None => Subscriber::new(user_id),
                }
            };

            subscriber.upsert_channel(address);
            let value =
                serde_json::to_vec(&subscriber).map_err(|e| Error::Storage(e.to_string()))?;
            table
                .insert(user_id, value.as_slice())
                .map_err(|e| Error::Storage(e.to_string()))?;
            subscriber
        };
        wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(subscriber)
    }

    async fn remove_channel(&self, user_id: &str, provider: Provider) -> Result<()> {
        let wtxn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        {
            let mut table = wtxn
                .open_table(SUBSCRIBERS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;

            let maybe_subscriber = {
                table
                    .get(user_id)
                    .map_err(|e| Error::Storage(e.to_string()))?
                    .map(|value| {
                        serde_json::from_slice::<Subscriber>(value.value())
                            .map_err(|e| Error::Storage(e.to_string()))
                    })
                    .transpose()?
            };

            if let Some(mut subscriber) = maybe_subscriber {
                if subscriber.remove_channel(provider) {
                    let value = serde_json::to_vec(&subscriber)
                        .map_err(|e| Error::Storage(e.to_string()))?;
                    table
                        .insert(user_id, value.as_slice())
                        .map_err(|e| Error::Storage(e.to_string()))?;
                }
            }
        }
        wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    async fn resolve(&self, audience: &Audience) -> Result<Vec<(String, DeliveryAddress)>> {
        let mut resolved = Vec::new();
        match audience {
            Audience::AllSubscribers => {
                for subscriber in self.list().await? {
                    let Subscriber {
                        user_id, channels, ..
                    } = subscriber;
                    for channel in channels {
                        resolved.push((user_id.clone(), channel));
                    }
                }
            }
            Audience::SpecificUsers { user_ids } => {
                let mut seen = HashSet::new();
                for user_id in user_ids {
                    if !seen.insert(user_id.as_str()) {
                        continue;
                    }
                    if let Some(subscriber) = self.get(user_id).await? {
                        let Subscriber {
                            user_id, channels, ..
                        } = subscriber;
                        for channel in channels {
                            resolved.push((user_id.clone(), channel));
                        }
                    }
                }
            }
        }
        Ok(resolved)
    }

    async fn revoke(&self, address: &DeliveryAddress) -> Result<usize> {
        let wtxn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        let mut removed = 0;
        {
            let mut table = wtxn
                .open_table(SUBSCRIBERS_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;

            let mut updated = Vec::new();
            for result in table.iter().map_err(|e| Error::Storage(e.to_string()))? {
                let (key, value) = result.map_err(|e| Error::Storage(e.to_string()))?;
                let mut subscriber: Subscriber = serde_json::from_slice(value.value())
                    .map_err(|e| Error::Storage(e.to_string()))?;

                let len_before = subscriber.channels.len();
                subscriber.channels.retain(|c| c != address);
                if subscriber.channels.len() != len_before {
                    removed += len_before - subscriber.channels.len();
                    subscriber.updated_at = Utc::now();
                    let bytes = serde_json::to_vec(&subscriber)
                        .map_err(|e| Error::Storage(e.to_string()))?;
                    updated.push((key.value().to_string(), bytes));
                }
            }

            for (key, bytes) in updated {
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(e.to_string()))?;
            }
        }
        wtxn.commit().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(removed)
    }

    async fn get(&self, user_id: &str) -> Result<Option<Subscriber>> {
        let rtxn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(e.to_string()))?;
        let table = rtxn
            .open_table(SUBSCRIBERS_TABLE)
            .map_err(|e| Error::Storage(e.to_string()))?;

        match table
            .get(user_id)
            .map_err(|e| Error::Storage(e.to_string()))?
        {
            Some(value) => {
                let subscriber: Subscriber = serde_json::from_slice(value.value())
                    .map_err(|e| Error::Storage(e.to_string()))?;
                Ok(Some(subscriber))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Subscriber>> {
        let rtxn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(e.to_string()))?;
        let table = rtxn
            .open_table(SUBSCRIBERS_TABLE)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut subscribers = Vec::new();
        for result in table.iter().map_err(|e| Error::Storage(e.to_string()))? {
            let (_, value) = result.map_err(|e| Error::Storage(e.to_string()))?;
            let subscriber: Subscriber = serde_json::from_slice(value.value())
                .map_err(|e| Error::Storage(e.to_string()))?;
            subscribers.push(subscriber);
        }
        Ok(subscribers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zeroize::Zeroizing;

    fn web_push(endpoint: &str) -> DeliveryAddress {
        DeliveryAddress::WebPush {
            endpoint: endpoint.into(),
            p256dh_key: "BNcW4oLJ".into(),
            auth_key: Zeroizing::new("c2VjcmV0".into()),
        }
    }

    #[tokio::test]
    async fn test_redb_subscriber_lifecycle() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = RedbStorage::open(&db_path).unwrap();
        let store = storage.subscriber_store();

        store
            .upsert_channel("p1", web_push("https://push.example/a"))
            .await
            .unwrap();
        store
            .upsert_channel(
                "p1",
                DeliveryAddress::Fcm {
                    token: "tok-1".into(),
                },
            )
            .await
            .unwrap();

        let fetched = store.get("p1").await.unwrap().unwrap();
        assert_eq!(fetched.channel_count(), 2);

        // Same provider replaces, never accumulates.
        store
            .upsert_channel("p1", web_push("https://push.example/b"))
            .await
            .unwrap();
        let fetched = store.get("p1").await.unwrap().unwrap();
        assert_eq!(fetched.channel_count(), 2);
        assert_eq!(
            fetched.channel_for(Provider::WebPush).unwrap().key(),
            "https://push.example/b"
        );

        store.remove_channel("p1", Provider::Fcm).await.unwrap();
        let resolved = store.resolve(&Audience::AllSubscribers).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1.provider(), Provider::WebPush);
    }

    #[tokio::test]
    async fn test_redb_revoke_across_subscribers() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = RedbStorage::open(&db_path).unwrap();
        let store = storage.subscriber_store();

        let shared = DeliveryAddress::OneSignal {
            player_id: "player-1".into(),
        };
        store.upsert_channel("p1", shared.clone()).await.unwrap();
        store.upsert_channel("p2", shared.clone()).await.unwrap();
        store
            .upsert_channel("p3", web_push("https://push.example/p3"))
            .await
            .unwrap();

        let removed = store.revoke(&shared).await.unwrap();
        assert_eq!(removed, 2);

        let resolved = store.resolve(&Audience::AllSubscribers).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "p3");

        // Zero-channel subscribers persist but resolve to nothing.
        assert!(store.get("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_redb_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let storage = RedbStorage::open(&db_path).unwrap();
            let store = storage.subscriber_store();
            store
                .upsert_channel("p1", web_push("https://push.example/a"))
                .await
                .unwrap();
        }

        let storage = RedbStorage::open(&db_path).unwrap();
        let store = storage.subscriber_store();
        let fetched = store.get("p1").await.unwrap().unwrap();
        assert_eq!(
            fetched.channel_for(Provider::WebPush).unwrap().key(),
            "https://push.example/a"
        );
    }

    #[tokio::test]
    async fn test_redb_resolve_specific_users() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = RedbStorage::open(&db_path).unwrap();
        let store = storage.subscriber_store();

        store
            .upsert_channel(
                "p1",
                DeliveryAddress::Fcm {
                    token: "tok-1".into(),
                },
            )
            .await
            .unwrap();
        store
            .upsert_channel(
                "p2",
                DeliveryAddress::Fcm {
                    token: "tok-2".into(),
                },
            )
            .await
            .unwrap();

        let resolved = store
            .resolve(&Audience::users(["p2", "ghost", "p2"]))
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "p2");
    }
}
