use similar::TextDiff;

/// Character-level similarity ratio in `[0, 1]` (2·matches / total length).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity_ratio(a.trim(), b.trim()) >= threshold
}
