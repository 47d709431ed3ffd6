use std::collections::BTreeSet;

/// One recognizer hypothesis. Lower distance means more similar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub subject_id: u32,
    pub distance: f64,
}

impl Candidate {
    pub fn new(subject_id: u32, distance: f64) -> Self {
        Self {
            subject_id,
            distance,
        }
    }
}

/// Candidates ordered by ascending distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedResult {
    candidates: Vec<Candidate>,
}

impl RankedResult {
    /// Sorts by distance; equal distances keep their input order.
    pub fn from_scores(scores: impl IntoIterator<Item = (u32, f64)>) -> Self {
        let mut candidates: Vec<Candidate> = scores
            .into_iter()
            .map(|(id, d)| Candidate::new(id, d))
            .collect();
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Self { candidates }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// 1-based rank of a subject, if present.
    pub fn rank_of(&self, subject_id: u32) -> Option<usize> {
        self.candidates
            .iter()
            .position(|c| c.subject_id == subject_id)
            .map(|i| i + 1)
    }

    /// Keeps only allowed subjects, preserving order and distances.
    pub fn retain_subjects(&self, allow: &BTreeSet<u32>) -> RankedResult {
        Self {
            candidates: self
                .candidates
                .iter()
                .filter(|c| allow.contains(&c.subject_id))
                .copied()
                .collect(),
        }
    }

    pub fn truncated(&self, n: usize) -> RankedResult {
        Self {
            candidates: self.candidates.iter().take(n).copied().collect(),
        }
    }
}
