use scoring_core::{Penalties, SubScores};

pub const W_BEHAVIOR: f64 = 0.30;
pub const W_STRUCTURE: f64 = 0.25;
pub const W_INSTITUTIONAL: f64 = 0.20;
pub const W_SENTIMENT: f64 = 0.15;
pub const W_EXECUTION: f64 = 0.10;

/// Fixed-weight blend of the five sub-scores (weights sum to 1.0).
pub fn weighted_sum(scores: &SubScores) -> f64 {
    W_BEHAVIOR * scores.behavior
        + W_STRUCTURE * scores.structure
        + W_INSTITUTIONAL * scores.institutional
        + W_SENTIMENT * scores.sentiment
        + W_EXECUTION * scores.execution_validity
}

/// Weighted sub-scores minus total penalties, clamped to 0..1.
///
/// Out-of-range sub-scores are not rejected, the clamp absorbs them. A NaN
/// (a broken provider) scores as 0.
pub fn composite_score(scores: &SubScores, penalties: &Penalties) -> f64 {
    let raw = weighted_sum(scores) - penalties.total();
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0)
}
