//! Carrier collaborator interface.
//!
//! Spec.md §1 treats the physical WebSocket carrier as an external
//! collaborator "delivering ordered, reliable, framed messages in both
//! directions." Grounded in the teacher's `signal_tx: mpsc::Sender<ServerEvent>`
//! field on `server/src/voice/peer.rs::Peer` — here generalized to a trait
//! so this crate depends only on the contract, not on `tokio-tungstenite`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DomainError;

/// An outbound framed send (spec.md §5, suspension point 3).
#[async_trait]
pub trait Carrier: Send + Sync {
    async fn send(&self, frame: Value) -> Result<(), DomainError>;
}
