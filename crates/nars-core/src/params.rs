use serde::{Deserialize, Serialize};

use crate::constants::{BAG_LEVELS, FORGET_QUALITY_RELATIVE};
use crate::error::ConfigError;

/// Tunable parameters consumed by the memory and its concepts.
///
/// Forgetting rates are given in durations; `cycles()` converts them to
/// cycles using `duration`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Capacity of the global concept bag.
    pub concept_bag_size: usize,
    pub concept_bag_levels: usize,
    /// Capacity of each concept's task-link bag.
    pub task_link_bag_size: usize,
    /// Capacity of each concept's term-link bag.
    pub term_link_bag_size: usize,
    pub link_bag_levels: usize,
    pub concept_beliefs_max: usize,
    pub concept_goals_max: usize,
    /// Capacity of the pending question FIFO (and of the quest FIFO).
    pub concept_questions_max: usize,
    /// Minimum priority for a budget to be worth processing.
    pub budget_threshold: f64,
    pub concept_forget_durations: f64,
    pub task_link_forget_durations: f64,
    pub term_link_forget_durations: f64,
    /// Term links tried per selection round before giving up on novelty.
    pub term_link_max_matched: usize,
    /// Recently paired term links remembered by each task link.
    pub term_link_record_length: usize,
    /// Cycles before a task link may be paired with the same term link again.
    pub novelty_horizon: u64,
    /// Cycles per duration.
    pub duration: u64,
    /// Desire expectation above which an operation goal is executed.
    pub decision_threshold: f64,
    /// Share of an item's quality kept as its forgetting floor.
    pub forget_quality_relative: f64,
    /// Seed for bag sampling. `None` seeds from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            concept_bag_size: 1000,
            concept_bag_levels: BAG_LEVELS,
            task_link_bag_size: 20,
            term_link_bag_size: 100,
            link_bag_levels: BAG_LEVELS,
            concept_beliefs_max: 7,
            concept_goals_max: 7,
            concept_questions_max: 5,
            budget_threshold: 0.01,
            concept_forget_durations: 2.0,
            task_link_forget_durations: 4.0,
            term_link_forget_durations: 10.0,
            term_link_max_matched: 10,
            term_link_record_length: 10,
            novelty_horizon: 100,
            duration: 5,
            decision_threshold: 0.51,
            forget_quality_relative: FORGET_QUALITY_RELATIVE,
            rng_seed: None,
        }
    }
}

impl Parameters {
    /// Convert a forgetting rate in durations to cycles.
    pub fn cycles(&self, durations: f64) -> f64 {
        durations * self.duration as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("concept_bag_size", self.concept_bag_size),
            ("concept_bag_levels", self.concept_bag_levels),
            ("task_link_bag_size", self.task_link_bag_size),
            ("term_link_bag_size", self.term_link_bag_size),
            ("link_bag_levels", self.link_bag_levels),
            ("concept_beliefs_max", self.concept_beliefs_max),
            ("concept_goals_max", self.concept_goals_max),
            ("concept_questions_max", self.concept_questions_max),
            ("term_link_max_matched", self.term_link_max_matched),
            ("duration", self.duration as usize),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Zero(field));
            }
        }

        let unit = [
            ("budget_threshold", self.budget_threshold),
            ("decision_threshold", self.decision_threshold),
            ("forget_quality_relative", self.forget_quality_relative),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        let rates = [
            ("concept_forget_durations", self.concept_forget_durations),
            ("task_link_forget_durations", self.task_link_forget_durations),
            ("term_link_forget_durations", self.term_link_forget_durations),
        ];
        for (field, value) in rates {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}
