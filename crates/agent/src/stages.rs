use serde::Deserialize;
use tracing::warn;

use rapport_core::domain::analysis::{
    StageDetectionResult, StageIndicators, SuggestedTransition,
};
use rapport_core::domain::stage::PipelineStage;

use crate::llm::{clamp_confidence, extract_json_object, CompletionRequest, InferenceClient};

const STAGE_SYSTEM_PROMPT: &str = "You classify real-estate client relationships into exactly one \
of five pipeline stages. Respond with a single JSON object and nothing else.\n\
\n\
Stage definitions:\n\
- Lead: initial inquiry, little qualification, no agreed next step.\n\
- New Opportunity: qualified interest, needs and rough budget known, first concrete steps agreed.\n\
- Active Opportunity: actively touring or negotiating, lender engaged, decisions imminent.\n\
- Under Contract: an accepted offer exists, milestones (inspection, appraisal, closing) pending.\n\
- Closed: the transaction completed.";

fn build_stage_prompt(text: &str, current_stage: Option<PipelineStage>) -> String {
    let current = current_stage
        .map(|stage| stage.canonical_name().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "The contact is currently recorded as: {current}.\n\
        Classify the conversation below.\n\
        Respond with JSON of exactly this shape:\n\
        {{\n\
        \x20 \"stage\": \"<one of the five stage names>\",\n\
        \x20 \"confidence\": 0,\n\
        \x20 \"reasoning\": \"\",\n\
        \x20 \"suggested_transition\": {{\"from\": \"\", \"to\": \"\", \"confidence\": 0}} or null,\n\
        \x20 \"indicators\": {{\"positive\": [], \"negative\": []}}\n\
        }}\n\
        \n\
        Conversation:\n{text}"
    )
}

#[derive(Debug, Default, Deserialize)]
struct WireStageResult {
    #[serde(default)]
    stage: String,
    #[serde(default)]
    confidence: i64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    suggested_transition: Option<WireTransition>,
    #[serde(default)]
    indicators: WireIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct WireTransition {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    confidence: i64,
}

#[derive(Debug, Default, Deserialize)]
struct WireIndicators {
    #[serde(default)]
    positive: Vec<String>,
    #[serde(default)]
    negative: Vec<String>,
}

/// Full-tier stage: relationship-stage classification. Infallible by
/// contract; collaborator failure yields the recorded stage (or Lead) at
/// zero confidence.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageDetector;

impl StageDetector {
    pub fn new() -> Self {
        Self
    }

    pub async fn detect_stage(
        &self,
        text: &str,
        current_stage: Option<PipelineStage>,
        client: &dyn InferenceClient,
    ) -> StageDetectionResult {
        let request = CompletionRequest::structured(
            STAGE_SYSTEM_PROMPT,
            build_stage_prompt(text, current_stage),
        );
        match client.complete(&request).await {
            Ok(raw) => parse_stage_result(&raw, current_stage).unwrap_or_else(|| {
                warn!(task = "stage_detection", "unparseable response; using degraded default");
                degraded_result(current_stage)
            }),
            Err(error) => {
                warn!(task = "stage_detection", %error, "inference failed; using degraded default");
                degraded_result(current_stage)
            }
        }
    }
}

fn degraded_result(current_stage: Option<PipelineStage>) -> StageDetectionResult {
    StageDetectionResult {
        current_stage: current_stage.unwrap_or_default(),
        confidence: 0,
        reasoning: "stage detection unavailable".to_string(),
        suggested_transition: None,
        indicators: StageIndicators::default(),
    }
}

fn parse_stage_result(
    raw: &str,
    current_stage: Option<PipelineStage>,
) -> Option<StageDetectionResult> {
    let json = extract_json_object(raw)?;
    let wire: WireStageResult = serde_json::from_str(json).ok()?;

    let detected_stage = PipelineStage::parse_loose(&wire.stage)
        .or(current_stage)
        .unwrap_or_default();

    // A transition suggestion survives only if both endpoints resolve to
    // canonical stages.
    let suggested_transition = wire.suggested_transition.and_then(|transition| {
        let from = PipelineStage::parse_loose(&transition.from)?;
        let to = PipelineStage::parse_loose(&transition.to)?;
        Some(SuggestedTransition { from, to, confidence: clamp_confidence(transition.confidence) })
    });

    Some(StageDetectionResult {
        current_stage: detected_stage,
        confidence: clamp_confidence(wire.confidence),
        reasoning: wire.reasoning,
        suggested_transition,
        indicators: StageIndicators {
            positive: wire.indicators.positive,
            negative: wire.indicators.negative,
        },
    })
}
