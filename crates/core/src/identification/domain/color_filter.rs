use std::collections::BTreeSet;

use crate::eye_color::domain::eye_color_classifier::CandidateColorSet;
use crate::eye_color::domain::palette::EyeColor;
use crate::identification::domain::gallery_registry::GalleryRegistry;

/// Colours both eyes agree on, or `{Different}` when they share none.
pub fn consensus_color(left: &CandidateColorSet, right: &CandidateColorSet) -> CandidateColorSet {
    let shared: CandidateColorSet = left.intersection(right).copied().collect();
    if shared.is_empty() {
        CandidateColorSet::from([EyeColor::Different])
    } else {
        shared
    }
}

/// Gallery subjects whose recorded colour is any of `colors`.
pub fn subjects_with_color(colors: &CandidateColorSet, registry: &GalleryRegistry) -> BTreeSet<u32> {
    registry
        .records()
        .iter()
        .filter(|r| r.eye_color.is_some_and(|c| colors.contains(&c)))
        .map(|r| r.subject_id)
        .collect()
}

/// Subjects consistent with the observed eyes.
///
/// With no eye there is no colour evidence and the whole gallery is
/// allowed. One eye is used directly. Two eyes go through the consensus
/// step. Extra entries beyond two are ignored.
pub fn allow_list(eyes: &[CandidateColorSet], registry: &GalleryRegistry) -> BTreeSet<u32> {
    let colors = match eyes {
        [] => {
            log::debug!("No eye colour evidence; allowing the whole gallery");
            return registry.subject_ids();
        }
        [only] => only.clone(),
        [left, right, ..] => consensus_color(left, right),
    };
    let allowed = subjects_with_color(&colors, registry);
    log::debug!(
        "Eye colours {colors:?} allow {} of {} subjects",
        allowed.len(),
        registry.gallery_size()
    );
    allowed
}
