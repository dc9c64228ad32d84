use serde::{Deserialize, Serialize};

use crate::domain::analysis::StageDetectionResult;
use crate::domain::stage::PipelineStage;

use PipelineStage::{ActiveOpportunity, Closed, Lead, NewOpportunity, UnderContract};

/// Outcome of checking a proposed stage move. Rejection is ordinary data,
/// not an error: callers surface the reason and keep the contact where it is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

/// How much human confirmation a suggested stage change requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionLevel {
    /// The system may apply the transition without review.
    Auto,
    /// Surface to the user as a suggestion.
    Review,
    /// Leave the decision entirely to the user.
    Manual,
}

/// Forward edges of the pipeline graph, self-loops included. Closed is
/// terminal: nothing leaves it except the self-loop.
fn forward_targets(from: PipelineStage) -> &'static [PipelineStage] {
    match from {
        Lead => &[NewOpportunity, Lead],
        NewOpportunity => &[ActiveOpportunity, Lead, NewOpportunity],
        ActiveOpportunity => &[UnderContract, NewOpportunity, ActiveOpportunity],
        UnderContract => &[Closed, ActiveOpportunity, UnderContract],
        Closed => &[Closed],
    }
}

/// Multi-step regressions permitted outside the forward graph. A deal can
/// fall apart and land more than one stage back; it can never leave Closed.
fn reverse_targets(from: PipelineStage) -> &'static [PipelineStage] {
    match from {
        Lead => &[],
        NewOpportunity => &[Lead],
        ActiveOpportunity => &[NewOpportunity, Lead],
        UnderContract => &[ActiveOpportunity, NewOpportunity],
        Closed => &[],
    }
}

pub fn validate_stage_transition(from: PipelineStage, to: PipelineStage) -> TransitionCheck {
    if forward_targets(from).contains(&to) {
        return TransitionCheck { valid: true, reason: None };
    }
    if reverse_targets(from).contains(&to) {
        return TransitionCheck {
            valid: true,
            reason: Some("Reverse transition allowed".to_string()),
        };
    }
    TransitionCheck {
        valid: false,
        reason: Some(format!("Cannot move from {from} to {to}")),
    }
}

/// Confidence-gated automation level for a detection result's suggestion.
pub fn transition_level(result: &StageDetectionResult) -> TransitionLevel {
    match &result.suggested_transition {
        None => TransitionLevel::Manual,
        Some(suggestion) if suggestion.confidence >= 90 => TransitionLevel::Auto,
        Some(suggestion) if suggestion.confidence >= 70 => TransitionLevel::Review,
        Some(_) => TransitionLevel::Manual,
    }
}

/// Whether the evidence supports actually moving the contact: either the
/// suggestion itself is near-certain, or the overall classification is
/// confident and corroborated by at least two positive indicators.
pub fn should_transition(result: &StageDetectionResult) -> bool {
    let confident_suggestion = result
        .suggested_transition
        .as_ref()
        .is_some_and(|suggestion| suggestion.confidence >= 90);
    confident_suggestion || (result.confidence >= 70 && result.indicators.positive.len() >= 2)
}

/// Signed progression score: positive when the suggestion moves the contact
/// forward in pipeline order, negative when it regresses, zero otherwise.
/// Magnitude is the suggestion's own confidence.
pub fn stage_progression(current: PipelineStage, result: &StageDetectionResult) -> i32 {
    let Some(suggestion) = &result.suggested_transition else {
        return 0;
    };
    let suggested_index = suggestion.to.index();
    let current_index = current.index();
    if suggested_index > current_index {
        i32::from(suggestion.confidence)
    } else if suggested_index < current_index {
        -i32::from(suggestion.confidence)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::analysis::{StageDetectionResult, StageIndicators, SuggestedTransition};
    use crate::domain::stage::PipelineStage;

    use super::{
        should_transition, stage_progression, transition_level, validate_stage_transition,
        TransitionLevel,
    };

    fn result_with_suggestion(confidence: u8) -> StageDetectionResult {
        StageDetectionResult {
            current_stage: PipelineStage::NewOpportunity,
            confidence,
            reasoning: "showing scheduled and lender engaged".to_string(),
            suggested_transition: Some(SuggestedTransition {
                from: PipelineStage::NewOpportunity,
                to: PipelineStage::ActiveOpportunity,
                confidence,
            }),
            indicators: StageIndicators {
                positive: vec!["scheduled showing".to_string(), "lender engaged".to_string()],
                negative: Vec::new(),
            },
        }
    }

    #[test]
    fn forward_edges_are_valid_without_a_reason() {
        let check =
            validate_stage_transition(PipelineStage::Lead, PipelineStage::NewOpportunity);
        assert!(check.valid);
        assert!(check.reason.is_none());
    }

    #[test]
    fn closed_is_terminal() {
        let check = validate_stage_transition(PipelineStage::Closed, PipelineStage::Lead);
        assert!(!check.valid);
        assert!(check.reason.is_some());

        let self_loop = validate_stage_transition(PipelineStage::Closed, PipelineStage::Closed);
        assert!(self_loop.valid);
    }

    #[test]
    fn single_step_regression_is_a_forward_edge() {
        let check = validate_stage_transition(
            PipelineStage::ActiveOpportunity,
            PipelineStage::NewOpportunity,
        );
        assert!(check.valid);
        assert!(check.reason.is_none());
    }

    #[test]
    fn multi_step_regression_is_marked_as_reverse() {
        let check =
            validate_stage_transition(PipelineStage::ActiveOpportunity, PipelineStage::Lead);
        assert!(check.valid);
        assert_eq!(check.reason.as_deref(), Some("Reverse transition allowed"));

        let fallen_contract = validate_stage_transition(
            PipelineStage::UnderContract,
            PipelineStage::NewOpportunity,
        );
        assert!(fallen_contract.valid);
        assert_eq!(fallen_contract.reason.as_deref(), Some("Reverse transition allowed"));
    }

    #[test]
    fn forward_jumps_are_rejected() {
        let check =
            validate_stage_transition(PipelineStage::Lead, PipelineStage::ActiveOpportunity);
        assert!(!check.valid);

        let skip_to_closed =
            validate_stage_transition(PipelineStage::ActiveOpportunity, PipelineStage::Closed);
        assert!(!skip_to_closed.valid);
    }

    #[test]
    fn transition_level_follows_confidence_bands() {
        assert_eq!(transition_level(&result_with_suggestion(95)), TransitionLevel::Auto);
        assert_eq!(transition_level(&result_with_suggestion(90)), TransitionLevel::Auto);
        assert_eq!(transition_level(&result_with_suggestion(75)), TransitionLevel::Review);
        assert_eq!(transition_level(&result_with_suggestion(50)), TransitionLevel::Manual);

        let no_suggestion = StageDetectionResult::default();
        assert_eq!(transition_level(&no_suggestion), TransitionLevel::Manual);
    }

    #[test]
    fn should_transition_accepts_either_gate() {
        // Near-certain suggestion alone.
        let mut by_suggestion = result_with_suggestion(92);
        by_suggestion.confidence = 40;
        by_suggestion.indicators.positive.truncate(1);
        assert!(should_transition(&by_suggestion));

        // Confident classification with two corroborating indicators.
        let by_indicators = result_with_suggestion(75);
        assert!(should_transition(&by_indicators));

        // Neither gate.
        let mut weak = result_with_suggestion(60);
        weak.indicators.positive.truncate(1);
        assert!(!should_transition(&weak));
    }

    #[test]
    fn progression_is_signed_by_pipeline_order() {
        let forward = result_with_suggestion(85);
        assert_eq!(stage_progression(PipelineStage::NewOpportunity, &forward), 85);
        assert_eq!(stage_progression(PipelineStage::UnderContract, &forward), -85);
        assert_eq!(stage_progression(PipelineStage::ActiveOpportunity, &forward), 0);
        assert_eq!(stage_progression(PipelineStage::Lead, &StageDetectionResult::default()), 0);
    }
}
