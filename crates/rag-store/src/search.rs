use rag_core::Candidate;

use crate::error::Result;
use crate::index::PassageIndex;

/// Similarity-ranked candidate source for the assembler.
///
/// Implementations return at most `pool` candidates, best first, with
/// `rank` counting up from 0.
pub trait SimilaritySearch {
    fn search(&self, question: &str, pool: usize) -> Result<Vec<Candidate>>;
}

impl SimilaritySearch for PassageIndex {
    fn search(&self, question: &str, pool: usize) -> Result<Vec<Candidate>> {
        PassageIndex::search(self, question, pool)
    }
}

impl<S: SimilaritySearch + ?Sized> SimilaritySearch for &S {
    fn search(&self, question: &str, pool: usize) -> Result<Vec<Candidate>> {
        (**self).search(question, pool)
    }
}
