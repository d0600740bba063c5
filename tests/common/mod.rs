//! Shared test doubles for the scenario/property tests in `tests/`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulsewave_core::carrier::Carrier;
use pulsewave_core::transport::{
    DataConsumerHandle, DataConsumerOptions, SubscribeOptions, TransportController,
};
use pulsewave_core::DomainError;
use serde_json::Value;

/// Records every transport call for assertions; never fails unless told to.
#[derive(Default)]
pub struct RecordingTransport {
    pub subscribed: Mutex<Vec<String>>,
    pub unsubscribed: Mutex<Vec<String>>,
}

#[async_trait]
impl TransportController for RecordingTransport {
    async fn ensure_webrtc_initialized(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn subscribe_to_track(&self, track_sid: &str, _opts: SubscribeOptions) -> Result<(), DomainError> {
        self.subscribed.lock().push(track_sid.to_string());
        Ok(())
    }

    async fn unsubscribe_from_track(&self, track_sid: &str) -> Result<(), DomainError> {
        self.unsubscribed.lock().push(track_sid.to_string());
        Ok(())
    }

    async fn subscribe_to_all_tracks(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn add_data_consumer(
        &self,
        _producer_id: &str,
        opts: DataConsumerOptions,
    ) -> Result<Box<dyn DataConsumerHandle>, DomainError> {
        Ok(Box::new(StubConsumerHandle { id: opts.id }))
    }
}

pub struct StubConsumerHandle {
    pub id: String,
}

impl DataConsumerHandle for StubConsumerHandle {
    fn id(&self) -> &str {
        &self.id
    }
    fn on_message(&self, _callback: Box<dyn Fn(Value) + Send + Sync>) {}
    fn on_close(&self, _callback: Box<dyn Fn() + Send + Sync>) {}
    fn on_error(&self, _callback: Box<dyn Fn(String) + Send + Sync>) {}
}

#[derive(Default)]
pub struct RecordingCarrier {
    pub sent: Mutex<Vec<Value>>,
}

#[async_trait]
impl Carrier for RecordingCarrier {
    async fn send(&self, frame: Value) -> Result<(), DomainError> {
        self.sent.lock().push(frame);
        Ok(())
    }
}

#[must_use]
pub fn stub_transport_and_carrier() -> (Arc<RecordingTransport>, Arc<RecordingCarrier>) {
    (Arc::new(RecordingTransport::default()), Arc::new(RecordingCarrier::default()))
}
