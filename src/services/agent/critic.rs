//! Grounding Critic
//!
//! Structural check that a synthesized answer cites at least one source with
//! a `[filename pX]` marker. The check does not verify that the citation
//! refers to an actual retrieved source or that the page number is in range,
//! and its verdict is observational: an ungrounded answer is surfaced and
//! marked, never rejected or retried.

use regex::Regex;

/// Checks answers for well-formed citation markers.
pub struct GroundingCritic {
    citation_re: Regex,
}

impl Default for GroundingCritic {
    fn default() -> Self {
        Self::new()
    }
}

impl GroundingCritic {
    /// Compile the citation pattern: a bracketed citation token followed by
    /// a space and a page token `p<digits>`.
    pub fn new() -> Self {
        Self {
            citation_re: Regex::new(r"\[[^\]]+ p\d+\]").expect("valid citation pattern"),
        }
    }

    /// True iff the answer contains at least one citation marker.
    pub fn check_grounded(&self, answer: &str) -> bool {
        self.citation_re.is_match(answer)
    }
}
