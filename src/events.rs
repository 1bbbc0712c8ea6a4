//! Delivery of warnings and errors produced in the background.
//!
//! Both channels are bounded `broadcast` channels. Producers never wait: when a subscriber
//! falls behind by more than the channel capacity, the oldest events are dropped and the
//! subscriber receives [`tokio::sync::broadcast::error::RecvError::Lagged`] before continuing
//! with the newer ones. Events sent while nobody is subscribed are discarded.

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::errors::ClientError;
use log::{error, warn};
use tokio::sync::broadcast;

pub struct EventForwarder {
    warnings: broadcast::Sender<ClientError>,
    errors: broadcast::Sender<ClientError>,
}

impl EventForwarder {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (warnings, _) = broadcast::channel(capacity);
        let (errors, _) = broadcast::channel(capacity);
        Self { warnings, errors }
    }

    pub fn warn(&self, err: ClientError) {
        warn!(event_id = err.kind.as_u16(); "{}", err);
        _ = self.warnings.send(err);
    }

    pub fn error(&self, err: ClientError) {
        error!(event_id = err.kind.as_u16(); "{}", err);
        _ = self.errors.send(err);
    }

    pub fn subscribe_warnings(&self) -> broadcast::Receiver<ClientError> {
        self.warnings.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ClientError> {
        self.errors.subscribe()
    }
}

impl Default for EventForwarder {
    fn default() -> Self {
        Self::new()
    }
}
