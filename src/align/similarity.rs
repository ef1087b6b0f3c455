use std::cmp::Ordering;

use rapidfuzz::fuzz;

/// Case-insensitive indel ratio `2 * lcs / (len_a + len_b)` scaled to `0..=100`.
pub fn similarity(left: &str, right: &str) -> u32 {
    let left = left.to_lowercase();
    let right = right.to_lowercase();
    (fuzz::ratio(left.chars(), right.chars()) * 100.0).round() as u32
}

/// One scored OCR token considered during a best-match scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    /// Position of the token in document order.
    pub index: usize,
    pub score: u32,
    /// Vertical distance from the anchoring name box; zero for name matches.
    pub gap: f64,
}

impl MatchCandidate {
    /// Score first, smaller gap second, earlier scan position third.
    pub fn rank(&self, other: &MatchCandidate) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| {
                other
                    .gap
                    .partial_cmp(&self.gap)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| other.index.cmp(&self.index))
    }

    pub fn outranks(&self, other: &MatchCandidate) -> bool {
        self.rank(other) == Ordering::Greater
    }
}

/// Keeps the highest ranked candidate; earlier candidates win exact ties.
pub fn best_candidate<I>(candidates: I) -> Option<MatchCandidate>
where
    I: IntoIterator<Item = MatchCandidate>,
{
    candidates
        .into_iter()
        .fold(None, |best, candidate| match best {
            Some(current) if !candidate.outranks(&current) => Some(current),
            _ => Some(candidate),
        })
}
