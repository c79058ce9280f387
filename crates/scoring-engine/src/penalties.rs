use scoring_core::{value_as_f64, Penalties, ScoreRequest};

/// Aggregate deductions never exceed this.
pub const PENALTY_CAP: f64 = 0.8;

const CAPPED_DECIMALS: i32 = 4;

/// Below this average volume a symbol is considered illiquid.
pub const LOW_VOLUME_THRESHOLD: f64 = 100_000.0;

/// One entry of the penalty catalog: when `applies` holds, deduct `value` under `name`.
#[derive(Clone, Copy)]
pub struct PenaltyRule {
    pub name: &'static str,
    pub value: f64,
    pub applies: fn(&ScoreRequest) -> bool,
}

impl std::fmt::Debug for PenaltyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PenaltyRule")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

fn is_low_volume(req: &ScoreRequest) -> bool {
    // Missing or unparseable volume skips the rule.
    req.average_volume()
        .and_then(value_as_f64)
        .map(|vol| vol < LOW_VOLUME_THRESHOLD)
        .unwrap_or(false)
}

fn has_earnings_soon(req: &ScoreRequest) -> bool {
    req.earnings_within_72h()
}

fn has_thin_chain(req: &ScoreRequest) -> bool {
    req.thin_option_chain()
}

pub const STANDARD_RULES: &[PenaltyRule] = &[
    PenaltyRule {
        name: "low_volume",
        value: 0.30,
        applies: is_low_volume,
    },
    PenaltyRule {
        name: "earnings_72h",
        value: 0.20,
        applies: has_earnings_soon,
    },
    PenaltyRule {
        name: "thin_chain",
        value: 0.10,
        applies: has_thin_chain,
    },
];

/// Evaluates the penalty catalog against a request.
///
/// Every matching rule applies; the result is then capped so that the sum
/// stays at or below [`PENALTY_CAP`].
#[derive(Debug, Clone)]
pub struct PenaltyEngine {
    rules: Vec<PenaltyRule>,
}

impl Default for PenaltyEngine {
    fn default() -> Self {
        Self::new(STANDARD_RULES.to_vec())
    }
}

impl PenaltyEngine {
    pub fn new(rules: Vec<PenaltyRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: PenaltyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn evaluate(&self, req: &ScoreRequest) -> Penalties {
        let applied: Penalties = self
            .rules
            .iter()
            .filter(|rule| (rule.applies)(req))
            .map(|rule| (rule.name, rule.value))
            .collect();

        if !applied.is_empty() {
            tracing::debug!("Penalties for {}: {:?}", req.symbol, applied);
        }

        cap_penalties(applied)
    }
}

/// Scale deductions down proportionally when their sum exceeds the cap.
///
/// Scaled values are rounded to 4 decimals without the rounded sum passing
/// the cap; sums at or below the cap pass through untouched.
pub fn cap_penalties(penalties: Penalties) -> Penalties {
    let total = penalties.total();
    if total <= PENALTY_CAP {
        return penalties;
    }

    let factor = PENALTY_CAP / total;
    penalties
        .map_values(|v| v * factor)
        .rounded_within(CAPPED_DECIMALS, PENALTY_CAP)
}

pub fn compute_penalties(req: &ScoreRequest) -> Penalties {
    PenaltyEngine::default().evaluate(req)
}
