//! Intent Router
//!
//! Classifies an incoming query as knowledge or action intent with a fixed
//! keyword gate. Keyword gating is a cheap, auditable pre-filter: an action
//! phrased unusually degrades into the knowledge branch instead of reaching
//! the action extractor.

use super::state::Intent;

/// Keywords whose presence (case-insensitive substring) marks a query as an
/// operational command.
pub const ACTION_KEYWORDS: [&str; 6] = [
    "pause",
    "unpause",
    "resume",
    "update hours",
    "change hours",
    "set hours",
];

/// Classify a query. Deterministic, total — never fails.
pub fn route(query: &str) -> Intent {
    let q = query.to_lowercase();
    if ACTION_KEYWORDS.iter().any(|keyword| q.contains(keyword)) {
        Intent::Action
    } else {
        Intent::Knowledge
    }
}
