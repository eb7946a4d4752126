#![forbid(unsafe_code)]

//! Notification dispatch: delivery adapters, fan-out, history.

pub mod adapters;
mod dispatcher;
mod store;
mod types;

pub use adapters::{
    DeliveryAdapter, FcmAdapter, FcmConfig, LoggingAdapter, OneSignalAdapter, OneSignalConfig,
    WebPushAdapter, WebPushConfig,
};
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use store::{DispatchLog, InMemoryDispatchLog};
pub use types::{DeliveryError, DeliveryOutcome, DeliveryResult, DispatchRecord, DispatchReport};
