//! End-to-end scenario tests exercising the handler registry against
//! full JSON frames, matching the concrete scenarios enumerated in
//! spec.md §8.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::stub_transport_and_carrier;
use pulsewave_core::emitter::EventEmitter;
use pulsewave_core::handlers::{build_default_registry, HandlerContext};
use pulsewave_core::protocol::PulseEvent;
use serde_json::json;

fn new_context() -> (HandlerContext, Arc<RecordedEvents>) {
    let (transport, carrier) = stub_transport_and_carrier();
    let events: Arc<EventEmitter<PulseEvent>> = Arc::new(EventEmitter::new());
    let recorded = Arc::new(RecordedEvents::default());
    let recorded_for_listener = recorded.clone();
    events.on(move |event: &PulseEvent| {
        recorded_for_listener.record(event);
    });
    (HandlerContext::new(transport, carrier, events), recorded)
}

#[derive(Default)]
struct RecordedEvents {
    names: parking_lot::Mutex<Vec<String>>,
}

impl RecordedEvents {
    fn record(&self, event: &PulseEvent) {
        let name = match event {
            PulseEvent::LocalParticipantJoined { .. } => "local-participant-joined",
            PulseEvent::ParticipantJoined { .. } => "participant-joined",
            PulseEvent::ParticipantLeft { .. } => "participant-left",
            PulseEvent::TrackPublished { .. } => "track-published",
            PulseEvent::TrackUnpublished { .. } => "track-unpublished",
            PulseEvent::TrackMuted { .. } => "track-muted",
            PulseEvent::TrackUnmuted { .. } => "track-unmuted",
            PulseEvent::TrackUnsubscribed { .. } => "track-unsubscribed",
            PulseEvent::DataReceived { .. } => "data-received",
            PulseEvent::CallReceived { .. } => "call-received",
            PulseEvent::CallAccepted { .. } => "call-accepted",
            PulseEvent::CallRejected { .. } => "call-rejected",
            PulseEvent::Error { .. } => "error",
            PulseEvent::LayerChanged { .. } => "layer-changed",
            PulseEvent::QualityAdjusted { .. } => "quality-adjusted",
        };
        self.names.lock().push(name.to_string());
    }

    fn contains(&self, name: &str) -> bool {
        self.names.lock().iter().any(|n| n == name)
    }

    fn count(&self, name: &str) -> usize {
        self.names.lock().iter().filter(|n| *n == name).count()
    }
}

#[tokio::test]
async fn scenario_1_join_with_pre_existing_participants() {
    let registry = build_default_registry();
    let (mut ctx, events) = new_context();

    registry
        .dispatch(
            &mut ctx,
            json!({
                "type": "joined",
                "room": {"id": "r1"},
                "participant": {"sid": "L", "identity": "alice"},
                "otherParticipants": [
                    {"sid": "B", "identity": "bob", "tracks": [{"sid": "t1", "kind": "audio", "muted": false}]}
                ],
            }),
        )
        .await;

    assert!(events.contains("local-participant-joined"));
    assert!(events.contains("participant-joined"));
    assert_eq!(ctx.room.local_participant().unwrap().identity, "alice");
    let bob = ctx.room.remote_participant("B").unwrap();
    assert!(bob.publication("t1").is_some());

    // auto_subscribe defaults true and fires a deferred subscribe_to_track;
    // give the spawned task a moment to run.
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn scenario_2_unpublish_preserves_publication_record() {
    let registry = build_default_registry();
    let (mut ctx, _events) = new_context();

    registry
        .dispatch(&mut ctx, json!({"type": "participant_joined", "participant": {"sid": "B", "identity": "bob"}}))
        .await;
    registry
        .dispatch(
            &mut ctx,
            json!({"type": "track_published", "participantSid": "B", "track": {"sid": "t1", "kind": "audio"}}),
        )
        .await;
    registry
        .dispatch(&mut ctx, json!({"type": "track_unpublished", "participantSid": "B", "trackSid": "t1"}))
        .await;

    let bob = ctx.room.remote_participant("B").unwrap();
    let publication = bob.publication("t1").unwrap();
    assert!(publication.handle().is_none());

    // Re-publishing the same sid must not create a duplicate descriptor.
    registry
        .dispatch(
            &mut ctx,
            json!({"type": "track_published", "participantSid": "B", "track": {"sid": "t1", "kind": "audio"}}),
        )
        .await;
    let bob = ctx.room.remote_participant("B").unwrap();
    assert_eq!(bob.publications().len(), 1);
}

#[tokio::test]
async fn scenario_5_unknown_type_frame_is_a_silent_no_op() {
    let registry = build_default_registry();
    let (mut ctx, events) = new_context();

    registry.dispatch(&mut ctx, json!({"type": "wat", "foo": 1})).await;

    assert_eq!(ctx.room.participant_count(), 0);
    assert_eq!(events.names.lock().len(), 0);
}

#[tokio::test]
async fn scenario_6_participant_left_cleans_up() {
    let registry = build_default_registry();
    let (mut ctx, events) = new_context();

    registry
        .dispatch(&mut ctx, json!({"type": "participant_joined", "participant": {"sid": "B", "identity": "bob"}}))
        .await;
    registry
        .dispatch(&mut ctx, json!({"type": "participant_left", "participantSid": "B"}))
        .await;

    assert!(ctx.room.remote_participant("B").is_none());
    assert!(events.contains("participant-left"));

    // Subsequent track events for "B" are silent no-ops, not errors.
    registry
        .dispatch(
            &mut ctx,
            json!({"type": "track_published", "participantSid": "B", "track": {"sid": "t9", "kind": "video"}}),
        )
        .await;
    assert_eq!(events.count("track-published"), 0);
}

/// P5: dispatch is total — arbitrary malformed or adversarial JSON never
/// causes an unhandled error or panic.
#[tokio::test]
async fn property_dispatch_is_total_for_arbitrary_input() {
    let registry = build_default_registry();
    let (mut ctx, _events) = new_context();

    for input in [
        json!(null),
        json!(1),
        json!("just a string"),
        json!([1, 2, 3]),
        json!({}),
        json!({"type": 123}),
        json!({"type": "track_published"}),
        json!({"type": "data_consumer_created", "id": "c1"}),
    ] {
        registry.dispatch(&mut ctx, input).await;
    }
}

/// P2 (emitter-level) exercised end to end: a listener registered while
/// handling `participant-joined` does not also see that same emission.
#[tokio::test]
async fn property_listener_registered_during_emit_skips_current_pass() {
    let registry = build_default_registry();
    let (mut ctx, _events) = new_context();
    let events = ctx.events.clone();
    let late_fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let late_fired_for_closure = late_fired.clone();
    let events_for_listener = events.clone();

    events.on(move |_event: &PulseEvent| {
        let late_fired_inner = late_fired_for_closure.clone();
        events_for_listener.on(move |_| {
            late_fired_inner.store(true, std::sync::atomic::Ordering::SeqCst);
        });
    });

    registry
        .dispatch(&mut ctx, json!({"type": "participant_joined", "participant": {"sid": "B", "identity": "bob"}}))
        .await;
    assert!(!late_fired.load(std::sync::atomic::Ordering::SeqCst));

    registry
        .dispatch(&mut ctx, json!({"type": "participant_joined", "participant": {"sid": "C", "identity": "carol"}}))
        .await;
    assert!(late_fired.load(std::sync::atomic::Ordering::SeqCst));
}
