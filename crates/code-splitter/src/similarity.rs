use crate::error::{Result, SplitterError};
use unicode_segmentation::UnicodeSegmentation;

/// Levenshtein distance over extended grapheme clusters, two rows of memory
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<&str> = a.graphemes(true).collect();
    let b: Vec<&str> = b.graphemes(true).collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, left) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, right) in b.iter().enumerate() {
            let cost = usize::from(left != right);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// `(max_len - distance) / max_len`; two empty strings are identical
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.graphemes(true).count().max(b.graphemes(true).count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein_distance(a, b);
    (max_len - distance) as f64 / max_len as f64
}

/// Near-duplicate test with a fixed acceptance threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityDetector {
    threshold: f64,
}

impl SimilarityDetector {
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold.is_finite() && (0.0..=1.0).contains(&threshold)) {
            return Err(SplitterError::invalid_config(format!(
                "similarity threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        similarity(a, b)
    }

    /// `similarity(a, b) >= threshold`, skipping the edit distance when lengths alone rule it out
    #[must_use]
    pub fn is_similar(&self, a: &str, b: &str) -> bool {
        let len_a = a.graphemes(true).count();
        let len_b = b.graphemes(true).count();
        let max_len = len_a.max(len_b);
        if max_len == 0 {
            return true;
        }
        // distance >= |len_a - len_b|, so similarity <= min / max
        let upper_bound = len_a.min(len_b) as f64 / max_len as f64;
        if upper_bound < self.threshold {
            return false;
        }
        similarity(a, b) >= self.threshold
    }
}
