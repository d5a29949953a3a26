use std::fmt;

use serde::{Deserialize, Serialize};

use crate::budget::or;
use crate::constants::{EVIDENTIAL_HORIZON, MAX_CONFIDENCE};

/// Frequency/confidence pair attached to judgments and goals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    frequency: f64,
    confidence: f64,
}

impl TruthValue {
    pub fn new(frequency: f64, confidence: f64) -> Self {
        let frequency = if frequency.is_nan() { 0.0 } else { frequency.clamp(0.0, 1.0) };
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, MAX_CONFIDENCE)
        };
        Self {
            frequency,
            confidence,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Expected frequency once the missing evidence is assumed neutral.
    pub fn expectation(&self) -> f64 {
        self.confidence * (self.frequency - 0.5) + 0.5
    }

    /// Same truth with confidence multiplied by `factor`.
    pub fn discounted(&self, factor: f64) -> Self {
        Self::new(self.frequency, self.confidence * factor)
    }

    /// Pool the evidence behind two truth values about the same content.
    /// Callers must make sure the evidential bases are disjoint.
    pub fn revise(&self, other: &TruthValue) -> TruthValue {
        let w1 = c2w(self.confidence);
        let w2 = c2w(other.confidence);
        let w = w1 + w2;
        if w <= 0.0 {
            return *self;
        }
        let frequency = (w1 * self.frequency + w2 * other.frequency) / w;
        TruthValue::new(frequency, w2c(w))
    }

    /// Quality a judgment contributes to a budget: the expectation, or a
    /// discounted complement for strongly negative judgments.
    pub fn to_quality(&self) -> f64 {
        let e = self.expectation();
        e.max((1.0 - e) * 0.75)
    }
}

fn c2w(c: f64) -> f64 {
    if c >= 1.0 {
        return f64::MAX;
    }
    EVIDENTIAL_HORIZON * c / (1.0 - c)
}

fn w2c(w: f64) -> f64 {
    w / (w + EVIDENTIAL_HORIZON)
}

/// Rank used to order belief and desire tables: confident judgments built
/// on little evidence (more original) come first.
pub fn rank_belief(truth: &TruthValue, evidence_len: usize) -> f64 {
    let originality = 1.0 / (evidence_len as f64 + 1.0);
    or(truth.confidence(), originality)
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{:.2};{:.2}%", self.frequency, self.confidence)
    }
}
