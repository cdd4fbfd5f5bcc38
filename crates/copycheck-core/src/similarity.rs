//! k-shingle Jaccard similarity.
//!
//! Both texts are normalized into token sequences, every contiguous window
//! of `k` tokens becomes a shingle, and the score is the Jaccard index of
//! the two shingle sets:
//!
//! ```text
//! score = |A ∩ B| / |A ∪ B|
//! ```
//!
//! Shingles keep local word order, so a permutation of the same words scores
//! lower than a verbatim copy. Normalization is deliberately simple:
//! lowercase, drop `.` and `,`, split on whitespace. No stemming or stop
//! words.

use std::collections::HashSet;

use crate::error::Result;

/// Shingle length used when none is configured.
pub const DEFAULT_SHINGLE_LEN: usize = 3;

/// Symmetric similarity between two plain-text documents.
///
/// Implementations return a score in `[0.0, 1.0]`. The error path exists for
/// detectors backed by something fallible; [`ShingleDetector`] never fails.
pub trait SimilarityDetector: Send + Sync {
    /// Name recorded in report details (e.g. `"shingle"`).
    fn name(&self) -> &str;

    fn compare(&self, a: &str, b: &str) -> Result<f64>;

    /// Preprocess a text that will be compared against many others.
    fn prepare(&self, text: &str) -> PreparedText {
        PreparedText::raw(text)
    }

    /// Same as [`compare`](Self::compare) with `a` already prepared by this
    /// detector.
    fn compare_prepared(&self, a: &PreparedText, b: &str) -> Result<f64> {
        self.compare(a.text(), b)
    }
}

/// A text plus whatever a detector derived from it up front.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedText {
    text: String,
    shingles: Option<HashSet<String>>,
}

impl PreparedText {
    pub fn raw(text: &str) -> Self {
        Self {
            text: text.to_string(),
            shingles: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shingles(&self) -> Option<&HashSet<String>> {
        self.shingles.as_ref()
    }
}

/// Jaccard similarity over sets of `k`-token shingles.
#[derive(Debug, Clone, Copy)]
pub struct ShingleDetector {
    shingle_len: usize,
}

impl ShingleDetector {
    /// A zero length is raised to 1.
    pub fn new(shingle_len: usize) -> Self {
        Self {
            shingle_len: shingle_len.max(1),
        }
    }

    pub fn shingle_len(&self) -> usize {
        self.shingle_len
    }

    /// Score two texts. Either text empty → 0.0 without normalizing.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let set_a = shingles(&tokenize(a), self.shingle_len);
        let set_b = shingles(&tokenize(b), self.shingle_len);
        jaccard(&set_a, &set_b)
    }

    /// Score `b` against an already computed shingle set of a non-empty text.
    pub fn score_against_set(&self, set_a: &HashSet<String>, b: &str) -> f64 {
        if b.is_empty() {
            return 0.0;
        }
        jaccard(set_a, &shingles(&tokenize(b), self.shingle_len))
    }
}

impl Default for ShingleDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SHINGLE_LEN)
    }
}

impl SimilarityDetector for ShingleDetector {
    fn name(&self) -> &str {
        "shingle"
    }

    fn compare(&self, a: &str, b: &str) -> Result<f64> {
        Ok(self.score(a, b))
    }

    fn prepare(&self, text: &str) -> PreparedText {
        let set = (!text.is_empty()).then(|| shingles(&tokenize(text), self.shingle_len));
        PreparedText {
            text: text.to_string(),
            shingles: set,
        }
    }

    fn compare_prepared(&self, a: &PreparedText, b: &str) -> Result<f64> {
        match a.shingles() {
            Some(set) => Ok(self.score_against_set(set, b)),
            None => self.compare(a.text(), b),
        }
    }
}

/// Lowercase, strip `.` and `,`, and split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    normalized.split_whitespace().map(str::to_string).collect()
}

/// Distinct `k`-token windows joined with single spaces.
///
/// Fewer than `k` tokens yields an empty set.
pub fn shingles(tokens: &[String], k: usize) -> HashSet<String> {
    if k == 0 || tokens.len() < k {
        return HashSet::new();
    }
    tokens.windows(k).map(|w| w.join(" ")).collect()
}

/// Jaccard index; 0.0 when both sets are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|s| large.contains(*s)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOX: &str = "the quick brown fox jumps over the lazy dog";

    fn detector() -> ShingleDetector {
        ShingleDetector::default()
    }

    #[test]
    fn identical_text_scores_one() {
        assert_eq!(detector().score(FOX, FOX), 1.0);
    }

    #[test]
    fn unrelated_text_scores_zero() {
        let other = "completely unrelated content about something else entirely";
        assert_eq!(detector().score(FOX, other), 0.0);
    }

    #[test]
    fn partial_overlap_with_bigrams() {
        let d = ShingleDetector::new(2);
        let a = "The quick brown fox jumps over the lazy dog";
        let b = "The quick brown fox jumps over the active cat";
        let score = d.score(a, b);
        assert!(score > 0.0 && score < 1.0, "got {}", score);
        // 6 shared bigrams out of 10 distinct
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(detector().score("", FOX), 0.0);
        assert_eq!(detector().score(FOX, ""), 0.0);
        assert_eq!(detector().score("", ""), 0.0);
    }

    #[test]
    fn short_text_scores_zero() {
        assert_eq!(detector().score("two words", "two words"), 0.0);
        assert_eq!(detector().score("two words", FOX), 0.0);
    }

    #[test]
    fn whitespace_only_scores_zero() {
        assert_eq!(detector().score("   \n ", "   \n "), 0.0);
    }

    #[test]
    fn symmetric() {
        let pairs = [
            (FOX, "the quick brown fox sleeps under the lazy dog"),
            ("a b c d e f", "c d e f g h"),
            ("one two three", FOX),
        ];
        for (a, b) in pairs {
            assert_eq!(detector().score(a, b), detector().score(b, a));
        }
    }

    #[test]
    fn bounded() {
        let texts = [
            FOX,
            "the the the the the",
            "dog lazy the over jumps fox brown quick the",
            "x",
        ];
        for a in texts {
            for b in texts {
                let s = detector().score(a, b);
                assert!((0.0..=1.0).contains(&s), "{} vs {} = {}", a, b, s);
            }
        }
    }

    #[test]
    fn normalization_ignores_case_and_punctuation() {
        let a = "The quick, brown fox.\nJumps over the lazy dog.";
        assert_eq!(detector().score(a, FOX), 1.0);
    }

    #[test]
    fn word_order_matters() {
        let shuffled = "dog lazy the over jumps fox brown quick the";
        assert!(detector().score(FOX, shuffled) < 0.5);
    }

    #[test]
    fn shingles_are_deduplicated() {
        let tokens = tokenize("a b a b a b");
        let set = shingles(&tokens, 2);
        assert_eq!(set.len(), 2);
        assert!(set.contains("a b"));
        assert!(set.contains("b a"));
    }

    #[test]
    fn tokenize_strips_only_dots_and_commas() {
        assert_eq!(
            tokenize("Hello, World.\nIt's  fine!"),
            vec!["hello", "world", "it's", "fine!"]
        );
    }

    #[test]
    fn zero_shingle_len_is_raised_to_one() {
        let d = ShingleDetector::new(0);
        assert_eq!(d.shingle_len(), 1);
        assert_eq!(d.score("a b", "a b"), 1.0);
    }

    #[test]
    fn prepared_text_scores_like_raw_text() {
        let d = ShingleDetector::new(2);
        let prepared = d.prepare(FOX);
        assert!(prepared.shingles().is_some());
        for other in [FOX, "the quick brown fox sleeps", "", "unrelated words here"] {
            assert_eq!(d.compare_prepared(&prepared, other).unwrap(), d.score(FOX, other));
        }

        let empty = d.prepare("");
        assert!(empty.shingles().is_none());
        assert_eq!(d.compare_prepared(&empty, FOX).unwrap(), 0.0);
    }

    #[test]
    fn trait_compare_matches_score() {
        let d = detector();
        assert_eq!(d.name(), "shingle");
        assert_eq!(d.compare(FOX, FOX).unwrap(), 1.0);
    }
}
