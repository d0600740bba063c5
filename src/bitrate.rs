//! Adaptive bitrate control loop.
//!
//! Grounded in `server/src/voice/quality.rs`'s `Quality` enum (`const fn`
//! ladder accessors, `downgrade`/`upgrade` with an ordinal-based clamp) —
//! generalized from the teacher's four-tier `{Low,Medium,High,Premium}`
//! quality ladder to spec.md §4.7's nine-rung simulcast ladder indexed by
//! (spatial, temporal) layer instead of a single ordinal.

use crate::quality::{NetworkQualityMetrics, QualityGrade};

/// One rung of the fixed simulcast ladder (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulcastLayer {
    pub spatial_layer: u8,
    pub temporal_layer: u8,
    pub target_bitrate_kbps: u32,
    pub width: u16,
    pub height: u16,
    pub frame_rate: u8,
}

const fn layer(
    spatial_layer: u8,
    temporal_layer: u8,
    target_bitrate_kbps: u32,
    width: u16,
    height: u16,
    frame_rate: u8,
) -> SimulcastLayer {
    SimulcastLayer { spatial_layer, temporal_layer, target_bitrate_kbps, width, height, frame_rate }
}

/// The fixed ladder from spec.md §4.7, ascending by bitrate.
pub const LADDER: [SimulcastLayer; 9] = [
    layer(0, 0, 100, 320, 180, 15),
    layer(1, 0, 300, 640, 360, 15),
    layer(1, 1, 500, 640, 360, 30),
    layer(2, 0, 800, 1280, 720, 15),
    layer(2, 1, 1500, 1280, 720, 30),
    layer(2, 2, 2500, 1280, 720, 60),
    layer(3, 0, 2000, 1920, 1080, 15),
    layer(3, 1, 3000, 1920, 1080, 30),
    layer(3, 2, 4500, 1920, 1080, 60),
];

const fn spatial_cap(grade: QualityGrade) -> u8 {
    match grade {
        QualityGrade::Excellent => 3,
        QualityGrade::Good => 2,
        QualityGrade::Poor => 1,
        QualityGrade::VeryPoor => 0,
    }
}

/// Pick the best layer for `metrics` per spec.md §4.7: among layers whose
/// `spatial_layer` is within the grade's cap, the highest-bitrate one that
/// still fits `bandwidth_kbps`; if none fits, the lowest layer within cap
/// (even if it exceeds budget — see scenario 4 in spec.md §8).
#[must_use]
pub fn recommend_layer(metrics: &NetworkQualityMetrics) -> SimulcastLayer {
    let cap = spatial_cap(metrics.quality);
    let within_cap = LADDER.iter().filter(|l| l.spatial_layer <= cap);

    within_cap
        .clone()
        .filter(|l| l.target_bitrate_kbps <= metrics.bandwidth_kbps)
        .max_by_key(|l| l.target_bitrate_kbps)
        .copied()
        .unwrap_or_else(|| {
            LADDER
                .iter()
                .filter(|l| l.spatial_layer <= cap)
                .min_by_key(|l| l.target_bitrate_kbps)
                .copied()
                .unwrap_or(LADDER[0])
        })
}

/// Hysteresis gate (spec.md §4.7): only a spatial-layer change of at least 1
/// is worth applying; temporal-only changes flap too easily to bother.
#[must_use]
pub fn should_change_layer(current: Option<SimulcastLayer>, new: SimulcastLayer) -> bool {
    match current {
        None => true,
        Some(current) => current.spatial_layer.abs_diff(new.spatial_layer) >= 1,
    }
}

/// Transport-facing effects the controller requests when applying a layer.
/// Spec.md §6: `setMaxSpatialLayer`/`setMaxTemporalLayer` are optional on
/// the transport controller, hence the plain trait with no `async-trait`
/// requirement here (neither call suspends per spec.md §5's suspension-point
/// enumeration).
pub trait LayerApplyTarget {
    fn set_max_spatial_layer(&self, spatial_layer: u8);
    fn set_max_temporal_layer(&self, temporal_layer: u8);
}

/// Per-consumer adaptive bitrate state machine. One instance per subscribed
/// video consumer (spec.md §9, "a single periodic task per consumer").
pub struct AdaptiveBitrateController {
    current: Option<SimulcastLayer>,
    manual: bool,
}

impl Default for AdaptiveBitrateController {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveBitrateController {
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None, manual: false }
    }

    #[must_use]
    pub const fn current_layer(&self) -> Option<SimulcastLayer> {
        self.current
    }

    /// Handle one `quality-update` sample: recommend a layer, and apply it
    /// (returning it) if hysteresis says the change is worth making and no
    /// manual override is active. Returns `None` when nothing changed.
    pub fn on_quality_update(
        &mut self,
        metrics: &NetworkQualityMetrics,
        target: &dyn LayerApplyTarget,
    ) -> Option<SimulcastLayer> {
        if self.manual {
            return None;
        }
        let recommended = recommend_layer(metrics);
        if !should_change_layer(self.current, recommended) {
            return None;
        }
        self.apply_layer(recommended, target);
        Some(recommended)
    }

    fn apply_layer(&mut self, layer: SimulcastLayer, target: &dyn LayerApplyTarget) {
        target.set_max_spatial_layer(layer.spatial_layer);
        target.set_max_temporal_layer(layer.temporal_layer);
        self.current = Some(layer);
    }

    /// Pin a specific layer, bypassing recommendation until
    /// [`Self::reset_to_automatic`] is called.
    pub fn set_manual_layer(&mut self, layer: SimulcastLayer, target: &dyn LayerApplyTarget) {
        self.manual = true;
        self.apply_layer(layer, target);
    }

    /// Clear manual override and forget the current layer so the next
    /// sample reapplies from scratch.
    pub fn reset_to_automatic(&mut self) {
        self.manual = false;
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTarget {
        spatial: RefCell<Option<u8>>,
        temporal: RefCell<Option<u8>>,
    }

    impl LayerApplyTarget for RecordingTarget {
        fn set_max_spatial_layer(&self, spatial_layer: u8) {
            *self.spatial.borrow_mut() = Some(spatial_layer);
        }
        fn set_max_temporal_layer(&self, temporal_layer: u8) {
            *self.temporal.borrow_mut() = Some(temporal_layer);
        }
    }

    fn metrics(quality: QualityGrade, bandwidth_kbps: u32) -> NetworkQualityMetrics {
        NetworkQualityMetrics {
            quality,
            bandwidth_kbps,
            rtt_ms: 100,
            jitter_ms: 5,
            packet_loss_fraction: 0.0,
        }
    }

    #[test]
    fn recommend_picks_highest_fitting_layer_within_cap() {
        let m = metrics(QualityGrade::Excellent, 2600);
        let layer = recommend_layer(&m);
        assert_eq!((layer.spatial_layer, layer.temporal_layer), (2, 2));
    }

    #[test]
    fn recommend_falls_back_to_lowest_within_cap_when_nothing_fits() {
        // Poor -> cap 1; every layer with spatial <= 1 exceeds a 50kbps
        // budget, so policy falls back to the cheapest one in that set,
        // (0,0)@100kbps (see DESIGN.md for this fallback's resolution).
        let m = metrics(QualityGrade::Poor, 50);
        let layer = recommend_layer(&m);
        assert_eq!((layer.spatial_layer, layer.temporal_layer), (0, 0));
    }

    #[test]
    fn should_change_layer_requires_spatial_delta() {
        let current = LADDER[4]; // (2,1)
        let same_spatial = LADDER[3]; // (2,0)
        let different_spatial = LADDER[6]; // (3,0)
        assert!(!should_change_layer(Some(current), same_spatial));
        assert!(should_change_layer(Some(current), different_spatial));
        assert!(should_change_layer(None, current));
    }

    #[test]
    fn on_quality_update_applies_and_records_current() {
        let mut controller = AdaptiveBitrateController::new();
        let target = RecordingTarget::default();
        let applied = controller
            .on_quality_update(&metrics(QualityGrade::Excellent, 5000), &target)
            .unwrap();
        assert_eq!(applied.spatial_layer, 3);
        assert_eq!(*target.spatial.borrow(), Some(3));
        assert_eq!(controller.current_layer().unwrap().spatial_layer, 3);
    }

    #[test]
    fn manual_layer_blocks_automatic_updates_until_reset() {
        let mut controller = AdaptiveBitrateController::new();
        let target = RecordingTarget::default();
        controller.set_manual_layer(LADDER[0], &target);
        let result = controller.on_quality_update(&metrics(QualityGrade::Excellent, 5000), &target);
        assert!(result.is_none());
        assert_eq!(controller.current_layer().unwrap().spatial_layer, 0);

        controller.reset_to_automatic();
        let result = controller.on_quality_update(&metrics(QualityGrade::Excellent, 5000), &target);
        assert!(result.is_some());
    }
}
