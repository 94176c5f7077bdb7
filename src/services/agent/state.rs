//! Agent Request & Final State
//!
//! The request envelope fed into the pipeline and the tagged final state it
//! produces. The two branches of a run surface as a sum type selected by the
//! intent discriminant, so exactly one branch's fields can exist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use ops_copilot_retrieval::Passage;

/// Lowest allowed sampling temperature.
pub const MIN_TEMPERATURE: f32 = 0.0;

/// Highest allowed sampling temperature.
pub const MAX_TEMPERATURE: f32 = 0.8;

/// Default retrieval breadth.
pub const DEFAULT_TOP_K: usize = 4;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// The classified purpose of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Informational question answered from retrieved sources.
    Knowledge,
    /// Operational command turned into an action proposal.
    Action,
}

impl fmt::Display for Intent {
    /// Capitalized form, as used in decision trace lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Knowledge => write!(f, "Knowledge"),
            Intent::Action => write!(f, "Action"),
        }
    }
}

/// Presentation style hint for answer synthesis. Affects verbosity
/// instructions only, never retrieval breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStyle {
    Detailed,
    Concise,
}

impl Default for AnswerStyle {
    fn default() -> Self {
        AnswerStyle::Detailed
    }
}

impl fmt::Display for AnswerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerStyle::Detailed => write!(f, "detailed"),
            AnswerStyle::Concise => write!(f, "concise"),
        }
    }
}

impl FromStr for AnswerStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "detailed" => Ok(AnswerStyle::Detailed),
            "concise" => Ok(AnswerStyle::Concise),
            other => Err(format!(
                "unknown style '{}', expected 'detailed' or 'concise'",
                other
            )),
        }
    }
}

/// The kind of operational change an action proposal describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PauseItem,
    UnpauseItem,
    UpdateHours,
    Unknown,
}

impl fmt::Display for ActionKind {
    /// Wire form, matching the serde representation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::PauseItem => write!(f, "pause_item"),
            ActionKind::UnpauseItem => write!(f, "unpause_item"),
            ActionKind::UpdateHours => write!(f, "update_hours"),
            ActionKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A structured, human-reviewable description of an operational change,
/// not yet executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionProposal {
    /// Proposal kind.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Verbatim source text.
    pub original_query: String,
    /// Item name, present only for pause/unpause proposals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Free-text details, present only for update-hours proposals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ActionProposal {
    /// An unrecognized request: only the original query is populated.
    pub fn unknown(original_query: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Unknown,
            original_query: original_query.into(),
            item: None,
            details: None,
        }
    }
}

/// One pipeline invocation's inputs.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Original user text; immutable once set.
    pub query: String,
    /// Requested retrieval breadth.
    pub top_k: usize,
    /// Presentation style hint.
    pub style: AnswerStyle,
    /// Sampling temperature, clamped to the allowed range.
    pub temperature: f32,
}

impl AgentRequest {
    /// Build a request with the standard defaults.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            style: AnswerStyle::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_style(mut self, style: AnswerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
        self
    }
}

/// Branch-specific result fields, selected by the intent discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Knowledge branch: retrieved passages and the grounding verdict.
    Knowledge {
        contexts: Vec<Passage>,
        grounded: bool,
    },
    /// Action branch: the extracted proposal.
    Action { proposed_action: ActionProposal },
}

/// Final state of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalState {
    /// Original user text.
    pub query: String,
    /// Intent assigned by the router.
    pub intent: Intent,
    /// Synthesized answer or action confirmation text.
    pub answer: String,
    /// Ordered decision trace, one line per node executed.
    pub log: Vec<String>,
    /// Branch-specific fields.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FinalState {
    /// Retrieved passages, if this was a knowledge run.
    pub fn contexts(&self) -> Option<&[Passage]> {
        match &self.outcome {
            Outcome::Knowledge { contexts, .. } => Some(contexts),
            Outcome::Action { .. } => None,
        }
    }

    /// Grounding verdict, if this was a knowledge run.
    pub fn grounded(&self) -> Option<bool> {
        match &self.outcome {
            Outcome::Knowledge { grounded, .. } => Some(*grounded),
            Outcome::Action { .. } => None,
        }
    }

    /// The extracted proposal, if this was an action run.
    pub fn proposed_action(&self) -> Option<&ActionProposal> {
        match &self.outcome {
            Outcome::Knowledge { .. } => None,
            Outcome::Action { proposed_action } => Some(proposed_action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_display_is_capitalized() {
        assert_eq!(Intent::Knowledge.to_string(), "Knowledge");
        assert_eq!(Intent::Action.to_string(), "Action");
    }

    #[test]
    fn intent_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&Intent::Knowledge).unwrap(),
            "\"knowledge\""
        );
    }

    #[test]
    fn action_kind_display_matches_wire_form() {
        assert_eq!(ActionKind::PauseItem.to_string(), "pause_item");
        assert_eq!(
            serde_json::to_string(&ActionKind::PauseItem).unwrap(),
            "\"pause_item\""
        );
    }

    #[test]
    fn style_parses_case_insensitively() {
        assert_eq!("Concise".parse::<AnswerStyle>().unwrap(), AnswerStyle::Concise);
        assert!("verbose".parse::<AnswerStyle>().is_err());
    }

    #[test]
    fn request_defaults() {
        let request = AgentRequest::new("what is the refund policy");
        assert_eq!(request.top_k, 4);
        assert_eq!(request.style, AnswerStyle::Detailed);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn temperature_is_clamped() {
        let request = AgentRequest::new("q").with_temperature(1.5);
        assert!((request.temperature - MAX_TEMPERATURE).abs() < f32::EPSILON);
        let request = AgentRequest::new("q").with_temperature(-0.1);
        assert!((request.temperature - MIN_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[test]
    fn proposal_serializes_type_tag_and_skips_absent_fields() {
        let proposal = ActionProposal {
            kind: ActionKind::PauseItem,
            original_query: "pause Cheesecake".to_string(),
            item: Some("Cheesecake".to_string()),
            details: None,
        };
        let json = serde_json::to_string(&proposal).unwrap();
        assert!(json.contains("\"type\":\"pause_item\""));
        assert!(json.contains("\"item\":\"Cheesecake\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn final_state_json_is_flat() {
        let state = FinalState {
            query: "pause X".to_string(),
            intent: Intent::Action,
            answer: "answer".to_string(),
            log: vec!["Router → Action".to_string()],
            outcome: Outcome::Action {
                proposed_action: ActionProposal::unknown("pause X"),
            },
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["intent"], "action");
        assert!(json.get("proposed_action").is_some());
        assert!(json.get("outcome").is_none(), "outcome must be flattened");
        assert!(json.get("contexts").is_none());
    }

    #[test]
    fn accessors_follow_branch() {
        let state = FinalState {
            query: "q".to_string(),
            intent: Intent::Knowledge,
            answer: "a".to_string(),
            log: vec![],
            outcome: Outcome::Knowledge {
                contexts: vec![],
                grounded: false,
            },
        };
        assert!(state.contexts().is_some());
        assert_eq!(state.grounded(), Some(false));
        assert!(state.proposed_action().is_none());
    }
}
