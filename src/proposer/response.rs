//! Text response parsing and recorded replay.

use serde::Deserialize;
use std::collections::HashMap;

use crate::allocator::Stage;

use super::{AssignmentProposer, Proposal, ProposalRequest, ProposerError};

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Bare(Vec<Proposal>),
    Wrapped {
        #[serde(default)]
        allocations: Vec<Proposal>,
    },
}

/// Parses a proposer text response.
///
/// Accepts `{"allocations": [...]}` or a bare `[...]`, optionally
/// wrapped in a Markdown code fence with or without a `json` tag. An
/// object without `allocations` yields no proposals.
///
/// # Errors
/// [`ProposerError::Malformed`] when the body is not one of the
/// accepted shapes.
pub fn parse_proposals(text: &str) -> Result<Vec<Proposal>, ProposerError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ProposerError::Malformed("empty response".into()));
    }
    let parsed: ResponseBody = serde_json::from_str(body)?;
    Ok(match parsed {
        ResponseBody::Bare(proposals) => proposals,
        ResponseBody::Wrapped { allocations } => allocations,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Replays recorded proposer output per stage.
///
/// Stages without a recording get no proposals.
#[derive(Debug, Clone, Default)]
pub struct ReplayProposer {
    recorded: HashMap<Stage, Result<Vec<Proposal>, ProposerError>>,
    calls: Vec<Stage>,
}

impl ReplayProposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the proposals returned for `stage`.
    pub fn with_stage(mut self, stage: Stage, proposals: Vec<Proposal>) -> Self {
        self.recorded.insert(stage, Ok(proposals));
        self
    }

    /// Records a failure for `stage`.
    pub fn with_failure(mut self, stage: Stage, error: ProposerError) -> Self {
        self.recorded.insert(stage, Err(error));
        self
    }

    /// Records a raw text response for `stage`; parse failures are
    /// replayed as errors.
    pub fn with_text(mut self, stage: Stage, text: &str) -> Self {
        self.recorded.insert(stage, parse_proposals(text));
        self
    }

    /// Stages the proposer was called for, in call order.
    pub fn calls(&self) -> &[Stage] {
        &self.calls
    }
}

impl AssignmentProposer for ReplayProposer {
    fn propose(&mut self, request: &ProposalRequest<'_>) -> Result<Vec<Proposal>, ProposerError> {
        self.calls.push(request.stage);
        self.recorded
            .get(&request.stage)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped() {
        let text = r#"{"allocations": [
            {"driver_id": "D1", "order_ids": ["Q1", "Q2"], "reasoning": "east cluster"},
            {"driver_id": "D2", "order_ids": []}
        ]}"#;
        let proposals = parse_proposals(text).unwrap();
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].order_ids, vec!["Q1", "Q2"]);
        assert_eq!(proposals[0].reasoning, "east cluster");
        assert!(proposals[1].order_ids.is_empty());
    }

    #[test]
    fn test_parse_fenced() {
        let text = "```json\n{\"allocations\": [{\"driver_id\": \"D1\", \"order_ids\": [\"Q1\"]}]}\n```";
        let proposals = parse_proposals(text).unwrap();
        assert_eq!(proposals[0].driver_id, "D1");

        let plain_fence = "```\n[{\"driver_id\": \"D2\", \"order_ids\": [\"Q9\"]}]\n```";
        let proposals = parse_proposals(plain_fence).unwrap();
        assert_eq!(proposals[0].driver_id, "D2");
    }

    #[test]
    fn test_parse_missing_allocations_is_empty() {
        assert!(parse_proposals("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_proposals("Sorry, I cannot help with that."),
            Err(ProposerError::Malformed(_))
        ));
        assert!(matches!(
            parse_proposals("```json\n```"),
            Err(ProposerError::Malformed(_))
        ));
        assert!(parse_proposals(r#"{"allocations": "none"}"#).is_err());
    }

    #[test]
    fn test_replay_with_text() {
        let replay = ReplayProposer::new()
            .with_text(Stage::Wedding, r#"[{"driver_id": "D1", "order_ids": ["Q1"]}]"#)
            .with_text(Stage::Regular, "not json");
        assert!(matches!(
            replay.recorded.get(&Stage::Wedding),
            Some(Ok(p)) if p.len() == 1
        ));
        assert!(matches!(
            replay.recorded.get(&Stage::Regular),
            Some(Err(ProposerError::Malformed(_)))
        ));
    }
}
