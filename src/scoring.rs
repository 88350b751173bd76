//! Traction scoring: one 0–100 number per item.
//!
//! score = ( w_eng  * norm(engagement, eng_cap)
//!         + w_disc * norm(discussion, disc_cap)
//!         + w_rec  * exp(-0.693 * age_h / half_life)
//!         + w_src  * source_weight ) * 100
//!
//! `norm(x, cap) = ln(1 + min(x, cap)) / ln(1 + cap)` saturates smoothly, so a
//! single viral item cannot drown everything else. The mix always sums to 1.0.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::source::{SignalCaps, Source, DEFAULT_DISCUSSION_CAP, DEFAULT_ENGAGEMENT_CAP};
use crate::source_weights::SourceWeightsConfig;

pub const DEFAULT_HALF_LIFE_HOURS: f64 = 12.0;
const DECAY_LN2: f64 = 0.693;

/// Relative weight of each signal. Kept normalized to sum 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TractionMix {
    pub engagement: f64,
    pub discussion: f64,
    pub recency: f64,
    pub source: f64,
}

impl Default for TractionMix {
    fn default() -> Self {
        Self {
            engagement: 0.40,
            discussion: 0.20,
            recency: 0.25,
            source: 0.15,
        }
    }
}

impl TractionMix {
    /// Rescale so the components sum to 1.0. Negative or non-finite parts
    /// count as 0; an all-zero mix falls back to the default.
    pub fn normalized(self) -> Self {
        fn c(x: f64) -> f64 {
            if x.is_finite() {
                x.max(0.0)
            } else {
                0.0
            }
        }
        let (e, d, r, s) = (
            c(self.engagement),
            c(self.discussion),
            c(self.recency),
            c(self.source),
        );
        let sum = e + d + r + s;
        if sum <= f64::EPSILON {
            return Self::default();
        }
        Self {
            engagement: e / sum,
            discussion: d / sum,
            recency: r / sum,
            source: s / sum,
        }
    }

    pub fn sum(&self) -> f64 {
        self.engagement + self.discussion + self.recency + self.source
    }
}

/// Scorer with its configuration baked in. Cheap to share by reference.
#[derive(Clone, Debug)]
pub struct TractionScorer {
    mix: TractionMix,
    half_life_hours: f64,
    weights: SourceWeightsConfig,
}

impl Default for TractionScorer {
    fn default() -> Self {
        Self::new(
            SourceWeightsConfig::default_seed(),
            TractionMix::default(),
            DEFAULT_HALF_LIFE_HOURS,
        )
    }
}

impl TractionScorer {
    pub fn new(weights: SourceWeightsConfig, mix: TractionMix, half_life_hours: f64) -> Self {
        let half_life_hours = if half_life_hours.is_finite() && half_life_hours > 0.0 {
            half_life_hours
        } else {
            DEFAULT_HALF_LIFE_HOURS
        };
        Self {
            mix: mix.normalized(),
            half_life_hours,
            weights,
        }
    }

    pub fn half_life_hours(&self) -> f64 {
        self.half_life_hours
    }

    pub fn source_weights(&self) -> &SourceWeightsConfig {
        &self.weights
    }

    /// Score one item. Never fails: bad counts become 0, negative ages
    /// become 0, bad caps become the defaults.
    pub fn score(
        &self,
        source: Source,
        engagement: f64,
        discussion: f64,
        age_hours: f64,
        caps: SignalCaps,
    ) -> f64 {
        let eng = cap_log_norm(engagement, sanitize_cap(caps.engagement, DEFAULT_ENGAGEMENT_CAP));
        let disc = cap_log_norm(discussion, sanitize_cap(caps.discussion, DEFAULT_DISCUSSION_CAP));
        let rec = recency(age_hours, self.half_life_hours);
        let src = self.weights.weight(source).clamp(0.0, 1.0);

        let raw = eng * self.mix.engagement
            + disc * self.mix.discussion
            + rec * self.mix.recency
            + src * self.mix.source;

        round2((raw * 100.0).clamp(0.0, 100.0))
    }
}

static DEFAULT_SCORER: Lazy<TractionScorer> = Lazy::new(TractionScorer::default);

/// Score with the built-in weights and mix.
pub fn traction_score(
    source: Source,
    engagement: f64,
    discussion: f64,
    age_hours: f64,
    engagement_cap: f64,
    discussion_cap: f64,
) -> f64 {
    DEFAULT_SCORER.score(
        source,
        engagement,
        discussion,
        age_hours,
        SignalCaps {
            engagement: engagement_cap,
            discussion: discussion_cap,
        },
    )
}

/// `ln(1 + min(x, cap)) / ln(1 + cap)`, in [0, 1].
pub fn cap_log_norm(x: f64, cap: f64) -> f64 {
    let x = sanitize_count(x);
    (x.min(cap).ln_1p() / cap.ln_1p()).clamp(0.0, 1.0)
}

/// Exponential decay, 1.0 at age 0 and 0.5 after one half-life.
pub fn recency(age_hours: f64, half_life_hours: f64) -> f64 {
    // NaN and future timestamps both count as "just published".
    let age = if age_hours.is_nan() {
        0.0
    } else {
        age_hours.max(0.0)
    };
    (-DECAY_LN2 * age / half_life_hours).exp().clamp(0.0, 1.0)
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn sanitize_count(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        0.0
    } else {
        x
    }
}

fn sanitize_cap(cap: f64, fallback: f64) -> f64 {
    if cap.is_finite() && cap > 0.0 {
        cap
    } else {
        fallback
    }
}
