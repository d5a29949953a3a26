//! Budget values: the (priority, durability, quality) triple that prices
//! every unit of work in the system.
//!
//! All three fields live in `[0, 1]`. Every constructor and mutator clamps,
//! so no sequence of decay, merge, or division can leave the unit interval.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Probabilistic OR: `1 - ∏(1 - x)`.
pub fn or(a: f64, b: f64) -> f64 {
    1.0 - (1.0 - a) * (1.0 - b)
}

/// Probabilistic AND: `∏ x`.
pub fn and(a: f64, b: f64) -> f64 {
    a * b
}

fn unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    priority: f64,
    durability: f64,
    quality: f64,
    /// Cycle at which forgetting was last applied. `None` until first touched.
    #[serde(skip)]
    last_forget_time: Option<u64>,
}

impl Budget {
    pub fn new(priority: f64, durability: f64, quality: f64) -> Self {
        Self {
            priority: unit(priority),
            durability: unit(durability),
            quality: unit(quality),
            last_forget_time: None,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn durability(&self) -> f64 {
        self.durability
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn set_priority(&mut self, v: f64) {
        self.priority = unit(v);
    }

    pub fn set_durability(&mut self, v: f64) {
        self.durability = unit(v);
    }

    pub fn set_quality(&mut self, v: f64) {
        self.quality = unit(v);
    }

    pub fn last_forget_time(&self) -> Option<u64> {
        self.last_forget_time
    }

    /// Stamp the budget as touched at `now` without forgetting anything.
    pub fn touch(&mut self, now: u64) {
        self.last_forget_time = Some(now);
    }

    pub fn increase_priority(&mut self, v: f64) {
        self.priority = unit(or(self.priority, unit(v)));
    }

    pub fn decrease_priority(&mut self, v: f64) {
        self.priority = unit(and(self.priority, unit(v)));
    }

    /// Priority is strictly above `threshold`.
    pub fn above_threshold(&self, threshold: f64) -> bool {
        self.priority > threshold
    }

    /// Geometric mean of the three fields.
    pub fn summary(&self) -> f64 {
        (self.priority * self.durability * self.quality).cbrt()
    }

    /// Even share of this budget's priority among `n` recipients.
    /// Durability and quality are kept. `n == 0` yields a zero-priority share.
    pub fn divide(&self, n: usize) -> Budget {
        let priority = if n == 0 { 0.0 } else { self.priority / n as f64 };
        Budget {
            priority: unit(priority),
            ..*self
        }
    }

    /// Geometric decay over `cycles` elapsed cycles: priority shrinks by
    /// `durability^(cycles / period)`. Durability is the retention factor
    /// per `period` cycles.
    pub fn decay(&mut self, cycles: f64, period: f64) {
        if cycles <= 0.0 || period <= 0.0 {
            return;
        }
        self.priority = unit(self.priority * self.durability.powf(cycles / period));
    }

    /// Forget toward a floor of `quality * relative` based on the cycles
    /// elapsed since the last touch, then stamp `now`. Returns the priority
    /// lost.
    pub fn forget(&mut self, now: u64, period: f64, relative: f64) -> f64 {
        let elapsed = match self.last_forget_time {
            Some(t) if now > t => (now - t) as f64,
            _ => 0.0,
        };
        self.last_forget_time = Some(now);

        let floor = unit(self.quality * relative);
        let before = self.priority;
        if before <= floor {
            return 0.0;
        }
        let mut excess = Budget {
            priority: before - floor,
            ..*self
        };
        excess.decay(elapsed, period);
        self.priority = unit(floor + excess.priority);
        before - self.priority
    }

    /// Combine with another budget for the same key: priority and quality
    /// take the maximum, durability is the priority-weighted average.
    pub fn merge(&mut self, other: &Budget) {
        let total = self.priority + other.priority;
        let durability = if total > 0.0 {
            (self.priority * self.durability + other.priority * other.durability) / total
        } else {
            self.durability.max(other.durability)
        };
        self.priority = unit(self.priority.max(other.priority));
        self.quality = unit(self.quality.max(other.quality));
        self.durability = unit(durability);
        self.last_forget_time = match (self.last_forget_time, other.last_forget_time) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:.4};{:.4};{:.4}$",
            self.priority, self.durability, self.quality
        )
    }
}
