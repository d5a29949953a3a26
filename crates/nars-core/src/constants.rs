/// Number of discrete priority levels in a bag unless configured otherwise.
pub const BAG_LEVELS: usize = 100;

/// Fraction of an item's quality kept as a floor when its priority is forgotten.
pub const FORGET_QUALITY_RELATIVE: f64 = 0.3;

/// Evidential horizon `k` in the weight/confidence conversion `c = w / (w + k)`.
pub const EVIDENTIAL_HORIZON: f64 = 1.0;

/// Upper bound for confidence; a judgment never becomes certain.
pub const MAX_CONFIDENCE: f64 = 0.99;

/// Maximum number of serials carried in a stamp's evidential base.
pub const MAX_EVIDENTIAL_BASE_LENGTH: usize = 20;

/// Confidence discount applied by `Concept::discount_confidence`.
pub const DISCOUNT_RATE: f64 = 0.5;

/// Upper bound on tasks processed from a single `Memory::input` call,
/// counting the derived tasks fed back into it.
pub const DERIVED_TASK_LIMIT: usize = 64;

/// Tolerance for floating point accounting comparisons.
pub const EPSILON: f64 = 1e-9;
