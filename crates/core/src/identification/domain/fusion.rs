use std::collections::BTreeSet;

use crate::identification::domain::ranked_result::RankedResult;

/// Restricts a recognizer ranking to the colour allow-list.
///
/// An allow-list covering the whole gallery carries no evidence and
/// leaves the ranking as is. A restriction that would remove every
/// candidate also falls back to the unfiltered ranking, so a non-empty
/// input always yields a non-empty output.
pub fn fuse(ranked: &RankedResult, allow: &BTreeSet<u32>, gallery_size: usize) -> RankedResult {
    if allow.len() >= gallery_size {
        return ranked.clone();
    }
    let filtered = ranked.retain_subjects(allow);
    if filtered.is_empty() {
        log::debug!(
            "Allow-list of {} subjects excludes every candidate; keeping the recognizer ranking",
            allow.len()
        );
        return ranked.clone();
    }
    filtered
}
