#![forbid(unsafe_code)]

//! Fan-out dispatcher.
//!
//! Validates the event, resolves the audience against the registry, runs
//! one bounded delivery attempt per address, prunes addresses that failed
//! permanently, and reports what happened. Transient failures are reported
//! and dropped; a caller who wants redelivery dispatches again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use super::adapters::DeliveryAdapter;
use super::store::DispatchLog;
use super::types::{
    DeliveryError, DeliveryOutcome, DeliveryResult, DispatchRecord, DispatchReport,
};
use crate::event::NotificationEvent;
use crate::registry::SubscriberStore;
use crate::subscriber::{DeliveryAddress, Provider};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound for one delivery attempt; an attempt still running when
    /// it elapses counts as a transient failure.
    pub attempt_timeout: Duration,
    /// Upper bound for a whole dispatch; attempts still pending at the
    /// deadline are canceled.
    pub dispatch_timeout: Duration,
    /// How many attempts run concurrently; the next batch starts when the
    /// previous one has drained.
    pub batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(30),
            batch_size: 500,
        }
    }
}

pub struct Dispatcher {
    subscribers: Arc<dyn SubscriberStore>,
    adapters: HashMap<Provider, Arc<dyn DeliveryAdapter>>,
    log: Option<Arc<dyn DispatchLog>>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(subscribers: Arc<dyn SubscriberStore>) -> Self {
        Self {
            subscribers,
            adapters: HashMap::new(),
            log: None,
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_dispatch_log(mut self, log: Arc<dyn DispatchLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn DeliveryAdapter>) -> Self {
        self.register_adapter(adapter);
        self
    }

    /// Registers `adapter` for its provider, replacing any previous one.
    pub fn register_adapter(&mut self, adapter: Arc<dyn DeliveryAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn configured_providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.adapters.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    /// Fans `event` out to every address the audience resolves to.
    ///
    /// Returns a report on every fan-out, however badly the deliveries
    /// went; the only error exits are event validation and a registry
    /// resolve failure.
    pub async fn dispatch(&self, event: NotificationEvent) -> Result<DispatchReport> {
        event.validate()?;
        let targets = self.subscribers.resolve(&event.audience).await?;

        let dispatched_at = Utc::now();
        let started = std::time::Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.dispatch_timeout;
        let attempted = targets.len();
        let event = Arc::new(event);

        let mut results: Vec<DeliveryResult> = Vec::with_capacity(attempted);
        let mut revoke_candidates: HashSet<DeliveryAddress> = HashSet::new();
        let mut lost = 0usize;

        let mut remaining = targets.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<_> = remaining
                .by_ref()
                .take(self.config.batch_size.max(1))
                .collect();

            if tokio::time::Instant::now() >= deadline {
                for (user_id, address) in batch.into_iter().chain(remaining.by_ref()) {
                    results.push(DeliveryResult {
                        user_id,
                        address,
                        outcome: DeliveryOutcome::TransientFailure {
                            reason: "canceled".into(),
                        },
                    });
                }
                break;
            }

            let mut join_set = JoinSet::new();
            for (user_id, address) in batch {
                let adapter = match self.adapters.get(&address.provider()) {
                    Some(adapter) => Arc::clone(adapter),
                    None => {
                        warn!(
                            provider = %address.provider(),
                            user_id = %user_id,
                            "no adapter configured for provider, delivery skipped"
                        );
                        results.push(DeliveryResult {
                            user_id,
                            address,
                            outcome: DeliveryOutcome::PermanentFailure {
                                reason: "provider not configured".into(),
                            },
                        });
                        continue;
                    }
                };
                let event = Arc::clone(&event);
                let attempt_timeout = self.config.attempt_timeout;
                join_set.spawn(async move {
                    let result =
                        deliver_one(adapter, &event, &address, attempt_timeout, deadline).await;
                    (user_id, address, result)
                });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((user_id, address, result)) => {
                        let outcome = match result {
                            Ok(()) => DeliveryOutcome::Delivered,
                            Err(DeliveryError::NotConfigured(reason)) => {
                                warn!(
                                    provider = %address.provider(),
                                    reason = %reason,
                                    "adapter reported a configuration problem"
                                );
                                DeliveryOutcome::PermanentFailure {
                                    reason: "provider not configured".into(),
                                }
                            }
                            Err(DeliveryError::Transient(reason)) => {
                                DeliveryOutcome::TransientFailure { reason }
                            }
                            Err(DeliveryError::Permanent(reason)) => {
                                revoke_candidates.insert(address.clone());
                                DeliveryOutcome::PermanentFailure { reason }
                            }
                        };
                        results.push(DeliveryResult {
                            user_id,
                            address,
                            outcome,
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "delivery task failed");
                        lost += 1;
                    }
                }
            }
        }

        for address in revoke_candidates {
            match self.subscribers.revoke(&address).await {
                Ok(removed) => {
                    info!(
                        provider = %address.provider(),
                        removed,
                        "pruned dead delivery address"
                    );
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        provider = %address.provider(),
                        "failed to prune delivery address"
                    );
                }
            }
        }

        let mut report = DispatchReport {
            attempted,
            ..DispatchReport::default()
        };
        for result in &results {
            match &result.outcome {
                DeliveryOutcome::Delivered => report.delivered += 1,
                DeliveryOutcome::TransientFailure { .. } => report.transient_failures += 1,
                DeliveryOutcome::PermanentFailure { .. } => {
                    report.permanent_failures.push(result.address.clone());
                }
            }
        }
        report.transient_failures += lost;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            attempted = report.attempted,
            delivered = report.delivered,
            transient = report.transient_failures,
            permanent = report.permanent_failures.len(),
            duration_ms,
            title = %event.title,
            "dispatch complete"
        );

        if let Some(log) = &self.log {
            let record = DispatchRecord {
                id: Uuid::new_v4(),
                title: event.title.clone(),
                tag: event.tag.clone(),
                attempted: report.attempted,
                delivered: report.delivered,
                transient_failures: report.transient_failures,
                permanent_failures: report.permanent_failures.len(),
                dispatched_at,
                duration_ms,
            };
            if let Err(e) = log.record(record).await {
                warn!(error = %e, "failed to record dispatch history");
            }
        }

        Ok(report)
    }
}

/// One bounded attempt. The dispatch deadline wins over the per-attempt
/// budget when it is nearer.
async fn deliver_one(
    adapter: Arc<dyn DeliveryAdapter>,
    event: &NotificationEvent,
    address: &DeliveryAddress,
    attempt_timeout: Duration,
    deadline: tokio::time::Instant,
) -> std::result::Result<(), DeliveryError> {
    let attempt = tokio::time::timeout(attempt_timeout, adapter.send(event, address));
    match tokio::time::timeout_at(deadline, attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(DeliveryError::Transient("timeout".into())),
        Err(_) => Err(DeliveryError::Transient("canceled".into())),
    }
}
