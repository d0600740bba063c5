//! Network quality sampling.
//!
//! Grounded in `server/src/voice/quality.rs`'s shape (a small `Copy` enum
//! with `const fn` accessors and exhaustive inline tests) generalized from
//! the teacher's fixed streaming-quality tiers to spec.md §4.6's
//! RTT/loss-banded grade derived from live transport stats. Threshold bands
//! are an explicit open question in spec.md §9(a); the bands chosen here
//! (documented on [`NetworkQualityConfig`]) match the example bands spec.md
//! §4.6 itself offers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A quality grade, ordered worst-to-best by discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    VeryPoor,
    Poor,
    Good,
    Excellent,
}

/// RTT/loss band thresholds used to derive a [`QualityGrade`] from raw stats.
/// Defaults follow the example bands given in spec.md §4.6.
#[derive(Debug, Clone, Copy)]
pub struct NetworkQualityConfig {
    pub excellent_rtt_ms: u32,
    pub excellent_loss: f64,
    pub good_rtt_ms: u32,
    pub good_loss: f64,
    pub poor_rtt_ms: u32,
    pub poor_loss: f64,
    /// How often the monitor polls the transport controller for stats.
    pub sample_interval: Duration,
}

impl Default for NetworkQualityConfig {
    fn default() -> Self {
        Self {
            excellent_rtt_ms: 150,
            excellent_loss: 0.01,
            good_rtt_ms: 300,
            good_loss: 0.03,
            poor_rtt_ms: 500,
            poor_loss: 0.08,
            sample_interval: Duration::from_secs(2),
        }
    }
}

impl NetworkQualityConfig {
    #[must_use]
    pub const fn grade_for(&self, rtt_ms: u32, loss_fraction: f64) -> QualityGrade {
        if rtt_ms <= self.excellent_rtt_ms && loss_fraction <= self.excellent_loss {
            QualityGrade::Excellent
        } else if rtt_ms <= self.good_rtt_ms && loss_fraction <= self.good_loss {
            QualityGrade::Good
        } else if rtt_ms <= self.poor_rtt_ms && loss_fraction <= self.poor_loss {
            QualityGrade::Poor
        } else {
            QualityGrade::VeryPoor
        }
    }
}

/// A single sample from the transport controller's raw stats for one consumer.
#[derive(Debug, Clone, Copy)]
pub struct RawStatsSample {
    pub rtt_ms: u32,
    pub jitter_ms: u32,
    pub packet_loss_fraction: f64,
    pub bandwidth_kbps: u32,
}

/// Derived quality reading, emitted as `quality-update` (and, on grade
/// transitions, `quality-change`) per spec.md §4.6.
#[derive(Debug, Clone, Copy)]
pub struct NetworkQualityMetrics {
    pub quality: QualityGrade,
    pub bandwidth_kbps: u32,
    pub rtt_ms: u32,
    pub jitter_ms: u32,
    pub packet_loss_fraction: f64,
}

/// Tracks the last-seen grade for a single consumer so samples can detect
/// grade transitions (`quality-change`) independent of per-sample noise
/// (`quality-update`, emitted unconditionally).
pub struct NetworkQualityMonitor {
    config: NetworkQualityConfig,
    last_grade: Option<QualityGrade>,
}

/// What the monitor observed on a single sample.
#[derive(Debug, Clone, Copy)]
pub struct QualitySample {
    pub metrics: NetworkQualityMetrics,
    pub grade_changed: bool,
}

impl NetworkQualityMonitor {
    #[must_use]
    pub const fn new(config: NetworkQualityConfig) -> Self {
        Self { config, last_grade: None }
    }

    /// Process one raw stats sample, deriving the grade and reporting
    /// whether it differs from the previous sample's grade.
    pub fn sample(&mut self, raw: RawStatsSample) -> QualitySample {
        let quality = self.config.grade_for(raw.rtt_ms, raw.packet_loss_fraction);
        let grade_changed = self.last_grade != Some(quality);
        self.last_grade = Some(quality);
        QualitySample {
            metrics: NetworkQualityMetrics {
                quality,
                bandwidth_kbps: raw.bandwidth_kbps,
                rtt_ms: raw.rtt_ms,
                jitter_ms: raw.jitter_ms,
                packet_loss_fraction: raw.packet_loss_fraction,
            },
            grade_changed,
        }
    }

    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        self.config.sample_interval
    }
}
