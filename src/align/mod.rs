pub mod aligner;
pub mod similarity;

pub use aligner::BoundingBoxAligner;
pub use similarity::{best_candidate, similarity, MatchCandidate};
