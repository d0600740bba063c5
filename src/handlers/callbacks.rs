//! Default callback wiring for participants.
//!
//! Spec.md §9 calls for "an explicit capabilities struct passed at
//! construction" rather than setters applied after the fact; these are the
//! default implementations the signaling handlers wire up when
//! constructing participants from inbound messages. Grounded in
//! `server/src/voice/peer.rs`'s pattern of firing transport calls from a
//! spawned task and logging failures rather than propagating them, which is
//! how spec.md §4.4/§7 wants auto-subscribe and similar deferred work
//! handled ("failures are logged only").

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::carrier::Carrier;
use crate::participant::{LocalParticipantCallbacks, SubscribeCallback};
use crate::protocol::DataKind;
use crate::transport::{SubscribeOptions, TransportController};

/// Delegates a remote participant's subscribe/unsubscribe callback to the
/// transport controller, firing the async call on a spawned task and
/// logging (never propagating) failures — these are "deferred subscriptions"
/// per spec.md §5 and must not block message ingestion.
pub struct TransportSubscribeCallback {
    transport: Arc<dyn TransportController>,
}

impl TransportSubscribeCallback {
    #[must_use]
    pub const fn new(transport: Arc<dyn TransportController>) -> Self {
        Self { transport }
    }
}

impl SubscribeCallback for TransportSubscribeCallback {
    fn subscribe(&self, track_sid: &str) {
        let transport = self.transport.clone();
        let track_sid = track_sid.to_string();
        tokio::spawn(async move {
            if let Err(err) = transport.subscribe_to_track(&track_sid, SubscribeOptions::default()).await {
                warn!(track_sid, code = err.code(), "deferred subscribe failed");
            }
        });
    }

    fn unsubscribe(&self, track_sid: &str) {
        let transport = self.transport.clone();
        let track_sid = track_sid.to_string();
        tokio::spawn(async move {
            if let Err(err) = transport.unsubscribe_from_track(&track_sid).await {
                warn!(track_sid, code = err.code(), "deferred unsubscribe failed");
            }
        });
    }
}

/// Local participant capabilities wired to the carrier's outbound `data`
/// frame and (for camera/mic) logged only — the concrete capture-device
/// binding is out of scope (spec.md §1, "audio/video capture devices").
pub struct DefaultLocalCallbacks {
    carrier: Arc<dyn Carrier>,
}

impl DefaultLocalCallbacks {
    #[must_use]
    pub const fn new(carrier: Arc<dyn Carrier>) -> Self {
        Self { carrier }
    }
}

impl LocalParticipantCallbacks for DefaultLocalCallbacks {
    fn set_camera_enabled(&self, enabled: bool) {
        warn!(enabled, "set_camera_enabled has no capture-device binding; logging only");
    }

    fn set_microphone_enabled(&self, enabled: bool) {
        warn!(enabled, "set_microphone_enabled has no capture-device binding; logging only");
    }

    fn publish_data(&self, kind: DataKind, value: Value) {
        let carrier = self.carrier.clone();
        tokio::spawn(async move {
            let kind_str = match kind {
                DataKind::Reliable => "reliable",
                DataKind::Lossy => "lossy",
            };
            let frame = serde_json::json!({"type": "data", "kind": kind_str, "value": value});
            if let Err(err) = carrier.send(frame).await {
                warn!(code = err.code(), "publish_data send failed");
            }
        });
    }
}
