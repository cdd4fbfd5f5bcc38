//! Best-match selection over a corpus scan.
//!
//! Candidates are folded left to right in corpus-lookup order. A candidate
//! replaces the current best only when its score is strictly greater, so on
//! equal scores the first one seen wins. Skipped candidates (`None`) and
//! scores that never beat 0.0 leave the match empty.

use uuid::Uuid;

/// Running maximum of a corpus scan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BestMatch {
    pub score: f64,
    pub work_id: Option<Uuid>,
}

impl BestMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one comparison result.
    pub fn observe(&mut self, work_id: Uuid, score: f64) {
        if score > self.score {
            self.score = score;
            self.work_id = Some(work_id);
        }
    }
}

/// Fold scored candidates in the order given. `None` marks a skipped work.
pub fn select_best<I>(scored: I) -> BestMatch
where
    I: IntoIterator<Item = (Uuid, Option<f64>)>,
{
    scored
        .into_iter()
        .fold(BestMatch::new(), |mut best, (work_id, score)| {
            if let Some(score) = score {
                best.observe(work_id, score);
            }
            best
        })
}
