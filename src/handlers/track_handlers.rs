//! Track-lifecycle handlers: published, unpublished, subscribed,
//! unsubscribed, muted, unmuted.
//!
//! Grounded in `server/src/voice/track.rs`'s subscriber bookkeeping and
//! `server/src/voice/sfu.rs::setup_track_handler`'s pattern of locating a
//! participant/publication pair before mutating — generalized to spec.md
//! §4.4's client-side track table instead of the teacher's RTP forwarding.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::DomainError;
use crate::handlers::registry::{HandlerContext, MessageHandler};
use crate::protocol::{InboundKind, InboundMessage, PulseEvent};
use crate::transport::SubscribeOptions;

/// Unknown participant for any track event is silently ignored (spec.md
/// §4.4 edge-case policy (a)): state catches up on the next participant
/// update.
fn warn_unknown_participant(sid: &str, event: &str) {
    debug!(participant_sid = sid, event, "track event for unknown participant; ignoring");
}

pub struct TrackPublishedHandler;

#[async_trait]
impl MessageHandler for TrackPublishedHandler {
    fn message_type(&self) -> &'static str {
        "track_published"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::TrackPublished { participant_sid, track, auto_subscribe } = &message.kind else {
            unreachable!("registry only routes \"track_published\" frames to TrackPublishedHandler");
        };

        let Some(participant) = ctx.room.remote_participant_mut(participant_sid) else {
            warn_unknown_participant(participant_sid, "track_published");
            return Ok(());
        };

        let created = participant.publish_track(track.clone());
        if !created {
            // Re-publish of an existing trackSid must not duplicate the descriptor
            // (spec.md §4.4 edge-case policy (b)).
            return Ok(());
        }

        ctx.events.emit(&PulseEvent::TrackPublished {
            participant_sid: participant_sid.clone(),
            track_sid: track.sid.clone(),
        });

        let should_subscribe = auto_subscribe.unwrap_or(ctx.auto_subscribe);
        if should_subscribe {
            let transport = ctx.transport.clone();
            let track_sid = track.sid.clone();
            tokio::spawn(async move {
                if let Err(err) = transport.ensure_webrtc_initialized().await {
                    warn!(track_sid, code = err.code(), "ensure_webrtc_initialized failed");
                    return;
                }
                if let Err(err) = transport.subscribe_to_track(&track_sid, SubscribeOptions::default()).await {
                    warn!(track_sid, code = err.code(), "subscribe_to_track failed");
                }
            });
        }
        Ok(())
    }
}

pub struct TrackUnpublishedHandler;

#[async_trait]
impl MessageHandler for TrackUnpublishedHandler {
    fn message_type(&self) -> &'static str {
        "track_unpublished"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::TrackUnpublished { participant_sid, track_sid } = &message.kind else {
            unreachable!("registry only routes \"track_unpublished\" frames to TrackUnpublishedHandler");
        };

        let Some(participant) = ctx.room.remote_participant_mut(participant_sid) else {
            warn_unknown_participant(participant_sid, "track_unpublished");
            return Ok(());
        };
        let Some(publication) = participant.publication_mut(track_sid) else {
            debug!(track_sid, "track_unpublished for unknown publication; ignoring");
            return Ok(());
        };
        // The publication entry remains in the map to permit transparent
        // re-publish reuse (spec.md §3, §9(b)).
        publication.clear_track();
        ctx.events.emit(&PulseEvent::TrackUnpublished {
            participant_sid: participant_sid.clone(),
            track_sid: track_sid.clone(),
        });
        Ok(())
    }
}

/// `track_subscribed` is purely informational: the transport layer owns
/// handle attachment, so this handler is a synchronization marker with no
/// state mutation (spec.md §4.4).
pub struct TrackSubscribedHandler;

#[async_trait]
impl MessageHandler for TrackSubscribedHandler {
    fn message_type(&self) -> &'static str {
        "track_subscribed"
    }

    async fn handle(&self, _ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::TrackSubscribed { participant_sid, track_sid } = &message.kind else {
            unreachable!("registry only routes \"track_subscribed\" frames to TrackSubscribedHandler");
        };
        debug!(participant_sid, track_sid, "track_subscribed marker received");
        Ok(())
    }
}

pub struct TrackUnsubscribedHandler;

#[async_trait]
impl MessageHandler for TrackUnsubscribedHandler {
    fn message_type(&self) -> &'static str {
        "track_unsubscribed"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::TrackUnsubscribed { participant_sid, track_sid } = &message.kind else {
            unreachable!("registry only routes \"track_unsubscribed\" frames to TrackUnsubscribedHandler");
        };

        let Some(participant) = ctx.room.remote_participant_mut(participant_sid) else {
            warn_unknown_participant(participant_sid, "track_unsubscribed");
            return Ok(());
        };
        let Some(publication) = participant.publication_mut(track_sid) else {
            debug!(track_sid, "track_unsubscribed for unknown publication; ignoring");
            return Ok(());
        };
        let had_handle = publication.handle().is_some();
        publication.clear_track_and_notify();
        if had_handle {
            ctx.events.emit(&PulseEvent::TrackUnsubscribed {
                participant_sid: participant_sid.clone(),
                track_sid: track_sid.clone(),
            });
        }
        Ok(())
    }
}

pub struct TrackMutedHandler;

#[async_trait]
impl MessageHandler for TrackMutedHandler {
    fn message_type(&self) -> &'static str {
        "track_muted"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::TrackMuted { participant_sid, track_sid } = &message.kind else {
            unreachable!("registry only routes \"track_muted\" frames to TrackMutedHandler");
        };
        apply_mute(ctx, participant_sid, track_sid, true)
    }
}

pub struct TrackUnmutedHandler;

#[async_trait]
impl MessageHandler for TrackUnmutedHandler {
    fn message_type(&self) -> &'static str {
        "track_unmuted"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::TrackUnmuted { participant_sid, track_sid } = &message.kind else {
            unreachable!("registry only routes \"track_unmuted\" frames to TrackUnmutedHandler");
        };
        apply_mute(ctx, participant_sid, track_sid, false)
    }
}

fn apply_mute(
    ctx: &mut HandlerContext,
    participant_sid: &str,
    track_sid: &str,
    muted: bool,
) -> Result<(), DomainError> {
    let Some(participant) = ctx.room.remote_participant_mut(participant_sid) else {
        warn_unknown_participant(participant_sid, if muted { "track_muted" } else { "track_unmuted" });
        return Ok(());
    };
    let Some(publication) = participant.publication_mut(track_sid) else {
        debug!(track_sid, "mute event for unknown publication; ignoring");
        return Ok(());
    };
    publication.set_muted(muted);
    // Only emitted when a handle is attached (spec.md §4.4): a publication
    // with no viewer attached has no one to notify.
    if publication.handle().is_some() {
        let event = if muted {
            PulseEvent::TrackMuted {
                participant_sid: participant_sid.to_string(),
                track_sid: track_sid.to_string(),
            }
        } else {
            PulseEvent::TrackUnmuted {
                participant_sid: participant_sid.to_string(),
                track_sid: track_sid.to_string(),
            }
        };
        ctx.events.emit(&event);
    }
    Ok(())
}
