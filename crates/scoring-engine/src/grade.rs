use scoring_core::Grade;

/// Descending thresholds, first match wins. Anything below the last is a D.
pub const GRADE_THRESHOLDS: [(f64, Grade); 4] = [
    (0.90, Grade::APlus),
    (0.85, Grade::A),
    (0.70, Grade::B),
    (0.60, Grade::C),
];

pub fn grade_from_composite(composite: f64) -> Grade {
    GRADE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| composite >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::D)
}
