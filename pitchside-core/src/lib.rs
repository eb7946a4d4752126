#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod registry;
pub mod secrets;
pub mod subscriber;

pub use config::{ApiConfig, Config};
pub use dispatch::{
    DeliveryAdapter, DeliveryError, DeliveryOutcome, DeliveryResult, DispatchConfig, DispatchLog,
    DispatchRecord, DispatchReport, Dispatcher, FcmAdapter, FcmConfig, InMemoryDispatchLog,
    LoggingAdapter, OneSignalAdapter, OneSignalConfig, WebPushAdapter, WebPushConfig,
};
pub use error::{Error, Result};
pub use event::{Audience, NotificationEvent, DEFAULT_ICON};
pub use registry::{
    InMemorySubscriberStore, RedbStorage, RedbSubscriberStore, SubscriberStore,
};
pub use secrets::Credential;
pub use subscriber::{DeliveryAddress, Provider, Subscriber};
