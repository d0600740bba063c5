//! Participant identity, metadata, and track-publication ownership.
//!
//! Grounded in `server/src/voice/sfu.rs`'s `ParticipantInfo` (the wire-facing
//! snapshot struct) and `server/src/voice/peer.rs`'s `Peer` (the
//! `RwLock`-guarded mutable fields plus a side-channel of wired callbacks) —
//! generalized from the teacher's voice-call-specific fields to spec.md
//! §3's identity/state/metadata/publications model, and its local-only
//! capabilities struct from §9 ("Callback injection for local participant
//! actions").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::TrackDescriptor;
use crate::track::{PublicationState, TrackPublication};

/// Connection-lifecycle state of a participant (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    Joining,
    Connected,
    Disconnected,
    Reconnecting,
}

/// Wire-facing snapshot of a participant, as carried in `joined`,
/// `participant_joined`, and `updateInfo` calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub sid: String,
    pub identity: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub tracks: Vec<TrackDescriptor>,
}

/// Explicit capabilities struct for the local participant's camera/mic/data
/// actions, wired at construction time rather than via setters applied
/// post-hoc (spec.md §9) — this closes the race where events could fire
/// before the callbacks exist.
pub trait LocalParticipantCallbacks: Send + Sync {
    fn set_camera_enabled(&self, enabled: bool);
    fn set_microphone_enabled(&self, enabled: bool);
    fn publish_data(&self, kind: crate::protocol::DataKind, value: Value);
}

/// Callback a remote participant uses to (un)subscribe to one of its own
/// tracks; delegates to the transport controller (spec.md §4.4, `joined`).
pub trait SubscribeCallback: Send + Sync {
    fn subscribe(&self, track_sid: &str);
    fn unsubscribe(&self, track_sid: &str);
}

/// Outcome of a reconciliation pass ([`Participant::update_info`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackReconcileEvent {
    Published { track_sid: String },
    Unpublished { track_sid: String },
    Muted { track_sid: String },
    Unmuted { track_sid: String },
}

/// A room member: either the local participant (owns capabilities) or a
/// remote one (owns a subscribe callback). Track publications are owned
/// exclusively by the participant that published them (spec.md §3).
pub struct Participant {
    pub sid: String,
    pub identity: String,
    pub name: Option<String>,
    pub state: ParticipantState,
    pub metadata: HashMap<String, Value>,
    pub is_local: bool,
    publications: HashMap<String, TrackPublication>,
    local_callbacks: Option<Box<dyn LocalParticipantCallbacks>>,
    subscribe_callback: Option<Box<dyn SubscribeCallback>>,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("sid", &self.sid)
            .field("identity", &self.identity)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("is_local", &self.is_local)
            .field("publications", &self.publications.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Participant {
    /// Construct a remote participant from a wire `ParticipantInfo`,
    /// wiring its subscribe callback (spec.md §4.4, `joined`/`participant_joined`).
    #[must_use]
    pub fn new_remote(info: ParticipantInfo, subscribe_callback: Box<dyn SubscribeCallback>) -> Self {
        let mut participant = Self::bare(info.sid, info.identity, info.name, info.metadata, false);
        participant.subscribe_callback = Some(subscribe_callback);
        for track in info.tracks {
            participant.insert_published(track);
        }
        participant
    }

    /// Construct the local participant, wiring its camera/mic/data capabilities.
    #[must_use]
    pub fn new_local(info: ParticipantInfo, callbacks: Box<dyn LocalParticipantCallbacks>) -> Self {
        let mut participant = Self::bare(info.sid, info.identity, info.name, info.metadata, true);
        participant.local_callbacks = Some(callbacks);
        for track in info.tracks {
            participant.insert_published(track);
        }
        participant
    }

    fn bare(
        sid: String,
        identity: String,
        name: Option<String>,
        metadata: HashMap<String, Value>,
        is_local: bool,
    ) -> Self {
        Self {
            sid,
            identity,
            name,
            state: ParticipantState::Joining,
            metadata,
            is_local,
            publications: HashMap::new(),
            local_callbacks: None,
            subscribe_callback: None,
        }
    }

    fn insert_published(&mut self, descriptor: TrackDescriptor) {
        let mut publication = TrackPublication::new(descriptor.sid.clone(), descriptor.kind)
            .with_source(descriptor.source.unwrap_or_default());
        if let Some(name) = descriptor.name {
            publication = publication.with_name(name);
        }
        publication.set_muted(descriptor.muted);
        self.publications.insert(descriptor.sid, publication);
    }

    #[must_use]
    pub fn publications(&self) -> &HashMap<String, TrackPublication> {
        &self.publications
    }

    #[must_use]
    pub fn publication(&self, track_sid: &str) -> Option<&TrackPublication> {
        self.publications.get(track_sid)
    }

    pub fn publication_mut(&mut self, track_sid: &str) -> Option<&mut TrackPublication> {
        self.publications.get_mut(track_sid)
    }

    #[must_use]
    pub fn local_callbacks(&self) -> Option<&dyn LocalParticipantCallbacks> {
        self.local_callbacks.as_deref()
    }

    #[must_use]
    pub fn subscribe_callback(&self) -> Option<&dyn SubscribeCallback> {
        self.subscribe_callback.as_deref()
    }

    /// Append a new track descriptor, deduplicated on `trackSid` (spec.md
    /// §4.4, `track_published`: "append ... deduplicated"). Returns `true`
    /// if this created a new publication.
    pub fn publish_track(&mut self, descriptor: TrackDescriptor) -> bool {
        if self.publications.contains_key(&descriptor.sid) {
            return false;
        }
        self.insert_published(descriptor);
        true
    }

    /// `updateInfo` reconciliation (spec.md §4.5): the single reconciliation
    /// point for scalar fields and the full publication set. For each
    /// incoming descriptor: create it if new (yielding `Published`), or
    /// update its muted flag if the mute state changed (yielding
    /// `Muted`/`Unmuted`). For every existing publication whose `trackSid`
    /// is absent from `info`, `clearTrack` it and yield `Unpublished` — the
    /// record itself is **not** removed from the map (spec.md §3, `clearTrack`
    /// preserves the record; §9 open question (b) chooses preserve-on-republish).
    pub fn update_info(&mut self, info: ParticipantInfo) -> Vec<TrackReconcileEvent> {
        self.identity = info.identity;
        self.name = info.name;
        self.metadata = info.metadata;

        let mut events = Vec::new();
        let incoming_sids: std::collections::HashSet<&str> =
            info.tracks.iter().map(|t| t.sid.as_str()).collect();

        for descriptor in info.tracks {
            match self.publications.get_mut(&descriptor.sid) {
                Some(existing) => {
                    if existing.muted != descriptor.muted {
                        existing.set_muted(descriptor.muted);
                        events.push(if descriptor.muted {
                            TrackReconcileEvent::Muted { track_sid: descriptor.sid }
                        } else {
                            TrackReconcileEvent::Unmuted { track_sid: descriptor.sid }
                        });
                    }
                }
                None => {
                    let track_sid = descriptor.sid.clone();
                    self.insert_published(descriptor);
                    events.push(TrackReconcileEvent::Published { track_sid });
                }
            }
        }

        let stale: Vec<String> = self
            .publications
            .iter()
            .filter(|(sid, pub_)| {
                !incoming_sids.contains(sid.as_str()) && pub_.state != PublicationState::Unpublished
            })
            .map(|(sid, _)| sid.clone())
            .collect();

        for track_sid in stale {
            if let Some(publication) = self.publications.get_mut(&track_sid) {
                publication.clear_track();
            }
            events.push(TrackReconcileEvent::Unpublished { track_sid });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSubscribe;
    impl SubscribeCallback for NoopSubscribe {
        fn subscribe(&self, _track_sid: &str) {}
        fn unsubscribe(&self, _track_sid: &str) {}
    }

    fn descriptor(sid: &str, muted: bool) -> TrackDescriptor {
        TrackDescriptor {
            sid: sid.to_string(),
            kind: crate::track::TrackKind::Audio,
            muted,
            name: None,
            source: None,
        }
    }

    fn info(sid: &str, tracks: Vec<TrackDescriptor>) -> ParticipantInfo {
        ParticipantInfo {
            sid: sid.to_string(),
            identity: "bob".to_string(),
            name: None,
            metadata: HashMap::new(),
            tracks,
        }
    }

    #[test]
    fn new_remote_ingests_initial_tracks() {
        let p = Participant::new_remote(
            info("B", vec![descriptor("t1", false)]),
            Box::new(NoopSubscribe),
        );
        assert!(p.publication("t1").is_some());
        assert!(!p.is_local);
    }

    #[test]
    fn publish_track_deduplicates_on_sid() {
        let mut p = Participant::new_remote(info("B", vec![]), Box::new(NoopSubscribe));
        assert!(p.publish_track(descriptor("t1", false)));
        assert!(!p.publish_track(descriptor("t1", false)));
        assert_eq!(p.publications().len(), 1);
    }

    #[test]
    fn update_info_publishes_new_tracks() {
        let mut p = Participant::new_remote(info("B", vec![]), Box::new(NoopSubscribe));
        let events = p.update_info(info("B", vec![descriptor("t1", false)]));
        assert_eq!(events, vec![TrackReconcileEvent::Published { track_sid: "t1".into() }]);
    }

    #[test]
    fn update_info_unpublishes_missing_tracks_but_preserves_record() {
        let mut p = Participant::new_remote(
            info("B", vec![descriptor("t1", false)]),
            Box::new(NoopSubscribe),
        );
        let events = p.update_info(info("B", vec![]));
        assert_eq!(events, vec![TrackReconcileEvent::Unpublished { track_sid: "t1".into() }]);
        assert!(p.publication("t1").is_some());
        assert_eq!(p.publication("t1").unwrap().state, PublicationState::Unpublished);
    }

    #[test]
    fn update_info_round_trip_matches_fresh_apply() {
        let mut a = Participant::new_remote(info("B", vec![]), Box::new(NoopSubscribe));
        a.update_info(info("B", vec![descriptor("t1", false)]));
        a.update_info(info("B", vec![descriptor("t2", false)]));

        let mut b = Participant::new_remote(info("B", vec![]), Box::new(NoopSubscribe));
        b.update_info(info("B", vec![descriptor("t2", false)]));

        assert_eq!(a.publication("t2").unwrap().state, b.publication("t2").unwrap().state);
        // a additionally retains t1 as Unpublished (preserve-on-republish policy).
        assert!(a.publication("t1").is_some());
        assert!(b.publication("t1").is_none());
    }

    #[test]
    fn update_info_detects_mute_change() {
        let mut p = Participant::new_remote(
            info("B", vec![descriptor("t1", false)]),
            Box::new(NoopSubscribe),
        );
        let events = p.update_info(info("B", vec![descriptor("t1", true)]));
        assert_eq!(events, vec![TrackReconcileEvent::Muted { track_sid: "t1".into() }]);
    }
}
