//! Track publication state.
//!
//! Grounded in `server/src/voice/track_types.rs` (`TrackKind`/`TrackSource`
//! enums, serde renaming, `new`/factory-method style) and
//! `server/src/voice/track.rs` (`TrackRouter`'s subscriber bookkeeping,
//! scoped here down to sid bookkeeping since RTP forwarding itself is out of
//! scope — see `SPEC_FULL.md`'s track-router supplement).

use serde::{Deserialize, Serialize};

/// The media kind of a track, or `Data` for non-media publications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
    Data,
}

/// Lifecycle state of a [`TrackPublication`]. See spec.md §3: Published
/// (no handle) and Unpublished (cleared handle) are both "no handle"
/// states distinguished only by history — `Subscribed` is the only state
/// carrying a live remote handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Published,
    Subscribed,
    Unpublished,
}

/// An opaque transport-supplied handle to a subscribed remote track.
///
/// The core never inspects the handle's concrete type; it exists so
/// `TrackPublication` can carry *something* through `clearTrack`/subscribe
/// without this crate depending on a concrete media transport type.
/// `notify_unsubscribed` is the one action the core itself must be able to
/// trigger on it: spec.md's `track_unsubscribed` handler must "notify it of
/// unsubscription" as a step distinct from clearing the publication record.
pub trait RemoteTrackHandle: std::fmt::Debug + Send + Sync {
    fn notify_unsubscribed(&self);
}

/// A participant-owned track publication.
///
/// `handle` is `None` whenever `state` is `Published` or `Unpublished`;
/// `clearTrack` always clears it, it never clears `state` back to
/// `Published` — that would destroy the publish/subscribe history needed to
/// decide whether a later `track_published` for the same `sid` is a
/// duplicate.
pub struct TrackPublication {
    pub sid: String,
    pub name: Option<String>,
    pub kind: TrackKind,
    pub muted: bool,
    pub source: Option<String>,
    pub state: PublicationState,
    handle: Option<Box<dyn RemoteTrackHandle>>,
}

impl std::fmt::Debug for TrackPublication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackPublication")
            .field("sid", &self.sid)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("muted", &self.muted)
            .field("source", &self.source)
            .field("state", &self.state)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

impl TrackPublication {
    #[must_use]
    pub fn new(sid: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            sid: sid.into(),
            name: None,
            kind,
            muted: false,
            source: None,
            state: PublicationState::Published,
            handle: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        matches!(self.state, PublicationState::Subscribed)
    }

    #[must_use]
    pub fn handle(&self) -> Option<&dyn RemoteTrackHandle> {
        self.handle.as_deref()
    }

    /// Attach a transport-supplied handle, transitioning to `Subscribed`.
    pub fn set_handle(&mut self, handle: Box<dyn RemoteTrackHandle>) {
        self.handle = Some(handle);
        self.state = PublicationState::Subscribed;
    }

    /// Detach the handle while preserving the publication record (spec.md
    /// §3's `clearTrack`), transitioning to `Unpublished`. Idempotent.
    pub fn clear_track(&mut self) {
        self.handle = None;
        self.state = PublicationState::Unpublished;
    }

    /// `clearTrack`, but first notifying an attached handle of unsubscription
    /// — the two distinct actions `track_unsubscribed` requires, as opposed
    /// to `track_unpublished`'s plain `clearTrack`. No-op notification when
    /// no handle was attached.
    pub fn clear_track_and_notify(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.notify_unsubscribed();
        }
        self.state = PublicationState::Unpublished;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}
