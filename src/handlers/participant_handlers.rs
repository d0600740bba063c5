//! `joined`, `participant_joined`, `participant_left` handlers.
//!
//! Grounded in `server/src/voice/ws_handler.rs::handle_join`/`handle_leave`
//! (room/peer lookup, store mutation, broadcast) — generalized to spec.md
//! §4.4's client-side reconciliation instead of the teacher's server-side
//! peer admission.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::DomainError;
use crate::handlers::callbacks::{DefaultLocalCallbacks, TransportSubscribeCallback};
use crate::handlers::registry::{HandlerContext, MessageHandler};
use crate::participant::Participant;
use crate::protocol::{InboundKind, InboundMessage, PulseEvent};
use crate::room::RoomInfo;
use crate::transport::SubscribeOptions;

pub struct JoinedHandler;

#[async_trait]
impl MessageHandler for JoinedHandler {
    fn message_type(&self) -> &'static str {
        "joined"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::Joined {
            room_id,
            room_name,
            rtp_capabilities,
            participant,
            other_participants,
            auto_subscribe,
        } = &message.kind
        else {
            unreachable!("registry only routes \"joined\" frames to JoinedHandler");
        };

        ctx.room.info = Some(RoomInfo {
            id: room_id.clone(),
            name: room_name.clone(),
            created_at: chrono::Utc::now(),
        });
        ctx.room.rtp_capabilities = rtp_capabilities.clone();
        if let Some(auto_subscribe) = auto_subscribe {
            ctx.auto_subscribe = *auto_subscribe;
        }

        let local_sid = participant.sid.clone();
        let local = Participant::new_local(
            participant.clone(),
            Box::new(DefaultLocalCallbacks::new(ctx.carrier.clone())),
        );
        ctx.room.set_local_participant(local)?;
        ctx.events.emit(&PulseEvent::LocalParticipantJoined { sid: local_sid });

        for info in other_participants {
            let sid = info.sid.clone();
            let track_sids: Vec<String> = info.tracks.iter().map(|t| t.sid.clone()).collect();
            let remote = Participant::new_remote(
                info.clone(),
                Box::new(TransportSubscribeCallback::new(ctx.transport.clone())),
            );
            if let Err(err) = ctx.room.add_remote_participant(remote) {
                warn!(sid, code = err.code(), "failed to add participant from joined payload");
                continue;
            }
            ctx.events.emit(&PulseEvent::ParticipantJoined { sid: sid.clone() });

            if ctx.auto_subscribe {
                let transport = ctx.transport.clone();
                for track_sid in track_sids {
                    let transport = transport.clone();
                    tokio::spawn(async move {
                        if let Err(err) = transport
                            .subscribe_to_track(&track_sid, SubscribeOptions::default())
                            .await
                        {
                            warn!(track_sid, code = err.code(), "auto-subscribe failed");
                        }
                    });
                }
            }
        }

        if ctx.auto_subscribe {
            let transport = ctx.transport.clone();
            tokio::spawn(async move {
                if let Err(err) = transport.ensure_webrtc_initialized().await {
                    warn!(code = err.code(), "ensure_webrtc_initialized failed during auto-subscribe");
                    return;
                }
                if let Err(err) = transport.subscribe_to_all_tracks().await {
                    warn!(code = err.code(), "subscribe_to_all_tracks failed during auto-subscribe");
                }
            });
        }

        Ok(())
    }
}

pub struct ParticipantJoinedHandler;

#[async_trait]
impl MessageHandler for ParticipantJoinedHandler {
    fn message_type(&self) -> &'static str {
        "participant_joined"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::ParticipantJoined { participant } = &message.kind else {
            unreachable!("registry only routes \"participant_joined\" frames to ParticipantJoinedHandler");
        };

        // Duplicate sid is treated as an update (spec.md §9(c)):
        // `add_remote_participant` already overwrites in place.
        let sid = participant.sid.clone();
        let remote = Participant::new_remote(
            participant.clone(),
            Box::new(TransportSubscribeCallback::new(ctx.transport.clone())),
        );
        ctx.room.add_remote_participant(remote)?;
        ctx.events.emit(&PulseEvent::ParticipantJoined { sid });
        Ok(())
    }
}

pub struct ParticipantLeftHandler;

#[async_trait]
impl MessageHandler for ParticipantLeftHandler {
    fn message_type(&self) -> &'static str {
        "participant_left"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::ParticipantLeft { participant_sid } = &message.kind else {
            unreachable!("registry only routes \"participant_left\" frames to ParticipantLeftHandler");
        };

        if ctx.room.remove_remote_participant(participant_sid).is_none() {
            info!(participant_sid, "participant_left for unknown sid; no-op");
            return Ok(());
        }
        ctx.events.emit(&PulseEvent::ParticipantLeft { sid: participant_sid.clone() });
        Ok(())
    }
}
