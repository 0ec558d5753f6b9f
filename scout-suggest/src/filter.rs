//! Narrowing and ordering of candidate lists.

/// How a filtered candidate list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Keep the order the metadata listed the candidates in.
    Source,
    /// Alphabetical, ignoring case.
    Ascending,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Source
    }
}

/// Keep the candidates that contain `fragment`, ignoring case. An empty
/// fragment keeps everything.
pub fn filter_candidates(candidates: &[String], fragment: &str) -> Vec<String> {
    let needle = fragment.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| candidate.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Put `candidates` in `order`. Ties keep their relative order.
pub fn rank(mut candidates: Vec<String>, order: SortOrder) -> Vec<String> {
    if order == SortOrder::Ascending {
        candidates.sort_by_cached_key(|candidate| candidate.to_lowercase());
    }
    candidates
}

/// Filter by `fragment`, then order the survivors.
pub fn narrow(candidates: &[String], fragment: &str, order: SortOrder) -> Vec<String> {
    rank(filter_candidates(candidates, fragment), order)
}
