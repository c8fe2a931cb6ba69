//! Fuzzy subscription/title matching
//!
//! Historical titles carry no schema, so matching a record to a subscription
//! is a two-pass substring comparison: first the raw case-folded title, then
//! a normalized form with whitespace, punctuation, brackets and parentheses
//! stripped from both sides. The second pass tolerates differing
//! release-group formatting without resorting to distance-based matching.

/// Strip everything but alphanumerics and case-fold
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Does a free-text title refer to this subscription?
///
/// Checks the subscription's name and alias as substrings, raw pass first.
pub fn title_matches_subscription(title: &str, name: &str, alias: Option<&str>) -> bool {
    let folded = title.to_lowercase();
    let normalized = normalize_title(title);

    std::iter::once(name)
        .chain(alias)
        .map(|needle| (needle.to_lowercase(), normalize_title(needle)))
        // A needle that normalizes away entirely (whitespace or punctuation
        // only) would substring-match every title
        .filter(|(_, normalized_needle)| !normalized_needle.is_empty())
        .any(|(folded_needle, normalized_needle)| {
            folded.contains(&folded_needle) || normalized.contains(&normalized_needle)
        })
}
