use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// The five sub-scores feeding the composite, each expected in 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub behavior: f64,
    pub structure: f64,
    pub institutional: f64,
    pub sentiment: f64,
    pub execution_validity: f64,
}

impl SubScores {
    pub fn uniform(score: f64) -> Self {
        Self {
            behavior: score,
            structure: score,
            institutional: score,
            sentiment: score,
            execution_validity: score,
        }
    }

    pub fn rounded(&self, decimals: i32) -> Self {
        Self {
            behavior: round_to(self.behavior, decimals),
            structure: round_to(self.structure, decimals),
            institutional: round_to(self.institutional, decimals),
            sentiment: round_to(self.sentiment, decimals),
            execution_validity: round_to(self.execution_validity, decimals),
        }
    }
}

/// Named risk deductions, kept in the order they were applied.
///
/// Serialized as a JSON object `{name: value}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Penalties(Vec<(String, f64)>);

impl Penalties {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or overwrite a deduction.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, v)| v).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Apply `f` to every value, keeping names and order.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self(self.0.iter().map(|(n, v)| (n.clone(), f(*v))).collect())
    }

    /// Round every value to `decimals` places while keeping the sum at or
    /// below `cap`. Any excess introduced by rounding is taken back from the
    /// last entries.
    pub fn rounded_within(&self, decimals: i32, cap: f64) -> Self {
        let factor = 10f64.powi(decimals);
        let mut units: Vec<i64> = self
            .0
            .iter()
            .map(|(_, v)| (v * factor).round() as i64)
            .collect();

        let limit = (cap * factor + 1e-9).floor() as i64;
        let mut excess = units.iter().sum::<i64>() - limit;
        for unit in units.iter_mut().rev() {
            if excess <= 0 {
                break;
            }
            let take = excess.min((*unit).max(0));
            *unit -= take;
            excess -= take;
        }

        Self(
            self.0
                .iter()
                .zip(units)
                .map(|((name, _), unit)| (name.clone(), unit as f64 / factor))
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Penalties {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut penalties = Penalties::new();
        for (name, value) in iter {
            penalties.insert(name, value);
        }
        penalties
    }
}

impl Serialize for Penalties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Letter grade derived from the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text evidence gathered from the three feeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub news_summary: String,
    pub social_summary: String,
    pub gamma_note: String,
}

/// What the caller gets back for one scored snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResponse {
    pub hypothesis: String,
    /// Rounded to 3 decimals.
    pub scores: SubScores,
    /// Rounded to 3 decimals; the sum stays at or below the penalty cap.
    pub penalties: Penalties,
    /// 0..1, rounded to 3 decimals.
    pub composite: f64,
    pub grade: Grade,
    pub evidence: Evidence,
}
