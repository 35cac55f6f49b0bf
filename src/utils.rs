/// Tolerance used when reading a solved binary as 0 or 1
pub const EPSILON: f64 = 1e-5;

/// A shipped quantity counts only when it exceeds this value
pub const SHIPPED_THRESHOLD: f64 = 0.9;

/// A route arc counts as travelled when its value exceeds this value
pub const ARC_THRESHOLD: f64 = 0.5;
