//! Room state store: the authoritative per-connection view.
//!
//! Grounded in `server/src/voice/sfu.rs`'s `Room` (a `RwLock<HashMap<Uuid,
//! Arc<Peer>>>` keyed collection with add/remove/get accessors and
//! participant-count bookkeeping) — generalized from the teacher's
//! single-room-per-voice-channel model to spec.md §3's per-connection
//! `RoomState` owning at most one local participant plus a remote map,
//! enforcing invariants I1-I5.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::participant::Participant;

/// Room metadata (spec.md §3: id, name, created-at).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The authoritative per-connection room view. `rtp_capabilities` is opaque
/// to this crate (spec.md §3) and carried only to be handed back to the
/// transport controller.
pub struct RoomState {
    pub info: Option<RoomInfo>,
    pub rtp_capabilities: Option<serde_json::Value>,
    local_participant: Option<Participant>,
    remote_participants: HashMap<String, Participant>,
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: None,
            rtp_capabilities: None,
            local_participant: None,
            remote_participants: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn local_participant(&self) -> Option<&Participant> {
        self.local_participant.as_ref()
    }

    pub fn local_participant_mut(&mut self) -> Option<&mut Participant> {
        self.local_participant.as_mut()
    }

    /// Set the local participant. Rejected if `participant.sid` already
    /// appears in the remote map (I4), or if its `identity` is already
    /// claimed by a remote participant (I2 — identities are unique across
    /// participants, local or remote).
    pub fn set_local_participant(&mut self, participant: Participant) -> Result<(), DomainError> {
        if self.remote_participants.contains_key(&participant.sid) {
            return Err(DomainError::invalid_state(
                "cannot set local participant: sid already present as a remote participant",
            )
            .with_context("sid", participant.sid.clone()));
        }
        if let Some(collision) = self
            .remote_participants
            .values()
            .find(|p| p.identity == participant.identity)
        {
            return Err(DomainError::invalid_state(
                "cannot set local participant: identity already in use by a remote participant",
            )
            .with_context("identity", participant.identity.clone())
            .with_context("existingSid", collision.sid.clone()));
        }
        self.local_participant = Some(participant);
        Ok(())
    }

    #[must_use]
    pub fn remote_participant(&self, sid: &str) -> Option<&Participant> {
        self.remote_participants.get(sid)
    }

    pub fn remote_participant_mut(&mut self, sid: &str) -> Option<&mut Participant> {
        self.remote_participants.get_mut(sid)
    }

    #[must_use]
    pub fn remote_participants(&self) -> &HashMap<String, Participant> {
        &self.remote_participants
    }

    /// Insert or overwrite a remote participant. Enforces I1 (one slot per
    /// sid — overwrite is intentional, matching spec.md §9(c)'s decision to
    /// treat a duplicate `participant_joined` as an update) and I2 (no other
    /// participant, local or remote, may already claim this `identity`) and
    /// I4 (never the local participant's own sid).
    pub fn add_remote_participant(&mut self, participant: Participant) -> Result<(), DomainError> {
        if self
            .local_participant
            .as_ref()
            .is_some_and(|local| local.sid == participant.sid)
        {
            return Err(DomainError::invalid_state(
                "cannot add remote participant: sid collides with the local participant",
            )
            .with_context("sid", participant.sid.clone()));
        }
        if self
            .local_participant
            .as_ref()
            .is_some_and(|local| local.identity == participant.identity)
        {
            return Err(DomainError::invalid_state(
                "cannot add remote participant: identity already in use by the local participant",
            )
            .with_context("identity", participant.identity.clone()));
        }
        if let Some(collision) = self
            .remote_participants
            .values()
            .find(|p| p.identity == participant.identity && p.sid != participant.sid)
        {
            return Err(DomainError::invalid_state(
                "cannot add remote participant: identity already in use",
            )
            .with_context("identity", participant.identity.clone())
            .with_context("existingSid", collision.sid.clone()));
        }
        self.remote_participants.insert(participant.sid.clone(), participant);
        Ok(())
    }

    /// Remove a remote participant, dropping it and all of its publications
    /// atomically (I5 — the map entry owns the publications, so a single
    /// `remove` suffices). No-op if `sid` is absent (spec.md §4.4,
    /// `participant_left`).
    pub fn remove_remote_participant(&mut self, sid: &str) -> Option<Participant> {
        self.remote_participants.remove(sid)
    }

    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.remote_participants.len() + usize::from(self.local_participant.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    struct NoopSubscribe;
    impl crate::participant::SubscribeCallback for NoopSubscribe {
        fn subscribe(&self, _track_sid: &str) {}
        fn unsubscribe(&self, _track_sid: &str) {}
    }

    fn remote(sid: &str, identity: &str) -> Participant {
        Participant::new_remote(
            crate::participant::ParticipantInfo {
                sid: sid.to_string(),
                identity: identity.to_string(),
                name: None,
                metadata: Map::new(),
                tracks: vec![],
            },
            Box::new(NoopSubscribe),
        )
    }

    #[test]
    fn add_remote_participant_succeeds_for_unique_sid_and_identity() {
        let mut room = RoomState::new();
        assert!(room.add_remote_participant(remote("B", "bob")).is_ok());
        assert_eq!(room.participant_count(), 1);
    }

    #[test]
    fn duplicate_identity_across_distinct_sids_is_rejected() {
        let mut room = RoomState::new();
        room.add_remote_participant(remote("B", "bob")).unwrap();
        let err = room.add_remote_participant(remote("C", "bob")).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn remote_identity_cannot_collide_with_local_participant() {
        let mut room = RoomState::new();
        room.set_local_participant(remote("L", "alice")).unwrap();
        let err = room.add_remote_participant(remote("B", "alice")).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn local_participant_cannot_collide_with_remote_identity() {
        let mut room = RoomState::new();
        room.add_remote_participant(remote("B", "alice")).unwrap();
        let err = room.set_local_participant(remote("L", "alice")).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn re_adding_same_sid_is_treated_as_update_not_error() {
        let mut room = RoomState::new();
        room.add_remote_participant(remote("B", "bob")).unwrap();
        assert!(room.add_remote_participant(remote("B", "bob-renamed")).is_ok());
        assert_eq!(room.participant_count(), 1);
    }

    #[test]
    fn local_participant_cannot_collide_with_remote_sid() {
        let mut room = RoomState::new();
        room.add_remote_participant(remote("L", "bob")).unwrap();
        let local = remote("L", "alice");
        let err = room.set_local_participant(local).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn remove_remote_participant_is_noop_when_absent() {
        let mut room = RoomState::new();
        assert!(room.remove_remote_participant("ghost").is_none());
    }

    #[test]
    fn remove_remote_participant_drops_publications_atomically() {
        let mut room = RoomState::new();
        let mut participant = remote("B", "bob");
        participant.publish_track(crate::protocol::TrackDescriptor {
            sid: "t1".to_string(),
            kind: crate::track::TrackKind::Audio,
            muted: false,
            name: None,
            source: None,
        });
        room.add_remote_participant(participant).unwrap();
        let removed = room.remove_remote_participant("B").unwrap();
        assert_eq!(removed.publications().len(), 1);
        assert!(room.remote_participant("B").is_none());
    }
}
