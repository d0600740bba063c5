//! Signaling handler registry and the one-handler-per-message-type
//! implementations that back it (spec.md §4.3, §4.4).

pub mod call_handlers;
pub mod callbacks;
pub mod data_handlers;
pub mod misc_handlers;
pub mod participant_handlers;
pub mod registry;
pub mod track_handlers;

use std::sync::Arc;

pub use registry::{HandlerContext, HandlerRegistry, MessageHandler};

/// Build a [`HandlerRegistry`] with every handler named in spec.md §4.4
/// already registered under its message type.
#[must_use]
pub fn build_default_registry() -> HandlerRegistry {
    let registry = HandlerRegistry::new();
    registry.register(Arc::new(participant_handlers::JoinedHandler));
    registry.register(Arc::new(participant_handlers::ParticipantJoinedHandler));
    registry.register(Arc::new(participant_handlers::ParticipantLeftHandler));
    registry.register(Arc::new(track_handlers::TrackPublishedHandler));
    registry.register(Arc::new(track_handlers::TrackUnpublishedHandler));
    registry.register(Arc::new(track_handlers::TrackSubscribedHandler));
    registry.register(Arc::new(track_handlers::TrackUnsubscribedHandler));
    registry.register(Arc::new(track_handlers::TrackMutedHandler));
    registry.register(Arc::new(track_handlers::TrackUnmutedHandler));
    registry.register(Arc::new(misc_handlers::TransportCreatedHandler));
    registry.register(Arc::new(misc_handlers::TransportConnectedHandler));
    registry.register(Arc::new(data_handlers::DataHandler));
    registry.register(Arc::new(data_handlers::DataConsumerCreatedHandler));
    registry.register(Arc::new(data_handlers::DataConsumerClosedHandler));
    registry.register(Arc::new(data_handlers::DataProducerCreatedHandler));
    registry.register(Arc::new(call_handlers::CallReceivedHandler));
    registry.register(Arc::new(call_handlers::CallAcceptedHandler));
    registry.register(Arc::new(call_handlers::CallRejectedHandler));
    registry.register(Arc::new(misc_handlers::ErrorFrameHandler));
    registry
}
