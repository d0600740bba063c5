//! Transport controller collaborator interface.
//!
//! Spec.md §1 treats the WebRTC transport binding as an external
//! collaborator with only its interface specified (§6); this crate owns
//! policy and calls through this trait the same way `server/src/voice/peer.rs`
//! wraps a concrete `Arc<RTCPeerConnection>` behind `Peer`'s own methods —
//! here the wrapped type is unknown, only the contract is.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DomainError;

/// Options accepted by [`TransportController::add_data_consumer`] (spec.md §6).
#[derive(Debug, Clone)]
pub struct DataConsumerOptions {
    pub id: String,
    pub sctp_stream_parameters: Value,
    pub participant_sid: String,
    pub label: String,
    pub ordered: bool,
}

/// Handle to a created data consumer, returned by `add_data_consumer`.
/// Callback registration mirrors the teacher's webrtc-rs `on_track`/
/// `on_ice_candidate` style (see `server/src/voice/sfu.rs::setup_track_handler`,
/// `setup_ice_handler`) — spec.md §4.4 requires binding `message`/`close`/
/// `error` on the returned consumer.
pub trait DataConsumerHandle: Send + Sync {
    fn id(&self) -> &str;
    fn on_message(&self, callback: Box<dyn Fn(Value) + Send + Sync>);
    fn on_close(&self, callback: Box<dyn Fn() + Send + Sync>);
    fn on_error(&self, callback: Box<dyn Fn(String) + Send + Sync>);
}

/// Subscription options for [`TransportController::subscribe_to_track`].
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    pub preferred_layer: Option<(u8, u8)>,
}

/// The WebRTC transport collaborator (spec.md §6). Every method that
/// crosses into the transport is async because it awaits remote
/// acknowledgement (spec.md §5, suspension point 1); `set_max_spatial_layer`
/// and `set_max_temporal_layer` are plain trait methods on
/// [`crate::bitrate::LayerApplyTarget`] instead, since the controller
/// applies them synchronously once a consumer handle exists.
#[async_trait]
pub trait TransportController: Send + Sync {
    async fn ensure_webrtc_initialized(&self) -> Result<(), DomainError>;
    async fn subscribe_to_track(
        &self,
        track_sid: &str,
        opts: SubscribeOptions,
    ) -> Result<(), DomainError>;
    async fn unsubscribe_from_track(&self, track_sid: &str) -> Result<(), DomainError>;
    async fn subscribe_to_all_tracks(&self) -> Result<(), DomainError>;
    async fn add_data_consumer(
        &self,
        producer_id: &str,
        opts: DataConsumerOptions,
    ) -> Result<Box<dyn DataConsumerHandle>, DomainError>;
}
