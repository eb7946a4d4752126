use std::sync::Arc;

use pitchside_core::{DispatchLog, Dispatcher, SubscriberStore};

#[derive(Clone)]
pub struct AppState {
    pub subscribers: Arc<dyn SubscriberStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub dispatch_log: Arc<dyn DispatchLog>,
}

impl AppState {
    pub fn new(
        subscribers: Arc<dyn SubscriberStore>,
        dispatcher: Arc<Dispatcher>,
        dispatch_log: Arc<dyn DispatchLog>,
    ) -> Self {
        Self {
            subscribers,
            dispatcher,
            dispatch_log,
        }
    }
}
