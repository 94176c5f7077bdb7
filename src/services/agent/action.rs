//! Action Extractor
//!
//! Pure mapping from a raw query string to a structured action proposal.
//! Two ordered pattern classes are tried in sequence, first match wins;
//! anything else degrades to an `unknown` proposal for a human to resolve.

use regex::Regex;

use super::state::{ActionKind, ActionProposal};

/// Extracts structured action proposals from operational command text.
pub struct ActionExtractor {
    /// Verb + quoted-or-bare item name.
    item_re: Regex,
    /// Verb + optional "opening" + "hours" + trailing text.
    hours_re: Regex,
}

impl Default for ActionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExtractor {
    /// Compile the extraction patterns.
    pub fn new() -> Self {
        Self {
            item_re: Regex::new(r#"(?i)\b(pause|unpause|resume)\b\s+['"]?(.+?)['"]?\s*$"#)
                .expect("valid item action pattern"),
            hours_re: Regex::new(r"(?i)(update|set|change)\s+(opening\s+)?hours(.*)")
                .expect("valid hours pattern"),
        }
    }

    /// Map a query to an action proposal. Pure and total — never fails;
    /// ambiguous or malformed input yields `ActionKind::Unknown`.
    pub fn extract(&self, query: &str) -> ActionProposal {
        if let Some(caps) = self.item_re.captures(query) {
            let verb = caps[1].to_lowercase();
            let item = caps[2]
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .trim()
                .to_string();
            if !item.is_empty() {
                // "resume" normalizes to the same proposal kind as "unpause".
                let kind = if verb == "pause" {
                    ActionKind::PauseItem
                } else {
                    ActionKind::UnpauseItem
                };
                return ActionProposal {
                    kind,
                    original_query: query.to_string(),
                    item: Some(item),
                    details: None,
                };
            }
        }

        if let Some(matched) = self.hours_re.find(query) {
            return ActionProposal {
                kind: ActionKind::UpdateHours,
                original_query: query.to_string(),
                item: None,
                details: Some(matched.as_str().trim().to_string()),
            };
        }

        ActionProposal::unknown(query)
    }
}

/// Fixed-shape confirmation string surfaced as the answer for every
/// proposal kind, including `unknown`.
pub fn confirmation_answer(kind: ActionKind) -> String {
    format!(
        "I identified an action request: {}. Review the proposed parameters below and approve to execute.",
        kind
    )
}
