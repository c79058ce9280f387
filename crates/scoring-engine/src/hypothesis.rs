use scoring_core::{
    value_is_truthy, value_to_text, ScoreRequest, BREAKOUT_ABOVE_PREMARKET_HIGH,
    BREAKOUT_BELOW_PREMARKET_LOW,
};

/// Sits between the descriptive fragments and the bias phrase.
pub const SEPARATOR: &str = " — ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionalBias {
    CallSide,
    PutSide,
    RangeBound,
}

impl DirectionalBias {
    pub fn phrase(&self) -> &'static str {
        match self {
            DirectionalBias::CallSide => "call-side favored",
            DirectionalBias::PutSide => "put-side favored",
            DirectionalBias::RangeBound => "range-bound risk; patience",
        }
    }
}

struct BiasRule {
    bias: DirectionalBias,
    matches: fn(&ScoreRequest) -> bool,
}

fn broke_high(req: &ScoreRequest) -> bool {
    if req.breakout_is(BREAKOUT_ABOVE_PREMARKET_HIGH) {
        return true;
    }
    matches!((req.last_price(), req.opening_range_high()), (Some(last), Some(high)) if last > high)
}

fn broke_low(req: &ScoreRequest) -> bool {
    if req.breakout_is(BREAKOUT_BELOW_PREMARKET_LOW) {
        return true;
    }
    matches!((req.last_price(), req.opening_range_low()), (Some(last), Some(low)) if last < low)
}

/// Checked in order; the first match decides. No match means range-bound.
const BIAS_RULES: &[BiasRule] = &[
    BiasRule {
        bias: DirectionalBias::CallSide,
        matches: broke_high,
    },
    BiasRule {
        bias: DirectionalBias::PutSide,
        matches: broke_low,
    },
];

pub fn directional_bias(req: &ScoreRequest) -> DirectionalBias {
    BIAS_RULES
        .iter()
        .find(|rule| (rule.matches)(req))
        .map(|rule| rule.bias)
        .unwrap_or(DirectionalBias::RangeBound)
}

/// Short rule-based trade hypothesis built from price context and structure.
///
/// `"SPY trading above VWAP; breakout state: above_premarket_high — call-side favored."`
///
/// With nothing to describe the sentence is only the separator and the bias:
/// `" — range-bound risk; patience."`.
pub fn build_hypothesis(req: &ScoreRequest) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let (Some(last), Some(vwap)) = (req.last_price(), req.vwap()) {
        let side = if last > vwap { "above" } else { "below" };
        parts.push(format!("{} trading {} VWAP", req.symbol, side));
    }

    if let Some(state) = req.breakout_state().filter(|v| value_is_truthy(v)) {
        parts.push(format!("breakout state: {}", value_to_text(state)));
    }

    format!(
        "{}{}{}.",
        parts.join("; "),
        SEPARATOR,
        directional_bias(req).phrase()
    )
}
