//! Score normalisation shared by every backend.

use std::collections::BTreeMap;

/// Raw per-label scores as reported by a backend, on any non-negative scale
pub type RawScores = BTreeMap<String, f64>;

/// Convert raw scores into a probability distribution.
///
/// Negative and non-finite values are discarded. Returns an empty map when
/// nothing positive remains, which callers treat as "no usable detection".
pub fn normalize_scores(raw: &RawScores) -> BTreeMap<String, f64> {
    let finite: Vec<(&String, f64)> = raw
        .iter()
        .filter(|(_, v)| v.is_finite() && **v >= 0.0)
        .map(|(k, v)| (k, *v))
        .collect();

    let total: f64 = finite.iter().map(|(_, v)| v).sum();
    if total <= 0.0 || !total.is_finite() {
        return BTreeMap::new();
    }

    finite
        .into_iter()
        .map(|(label, value)| (label.clone(), value / total))
        .collect()
}

/// Label with the highest value. Ties go to the lexicographically smallest
/// label.
pub fn dominant_label<'a>(distribution: &'a BTreeMap<String, f64>) -> Option<&'a str> {
    let mut best: Option<(&'a str, f64)> = None;
    // BTreeMap iterates in label order, so strict `>` keeps the smallest label on ties
    for (label, &value) in distribution {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((label.as_str(), value)),
        }
    }
    best.map(|(label, _)| label)
}
