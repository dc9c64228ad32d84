use serde::Deserialize;
use tracing::warn;

use rapport_core::actions::{clamp_urgency, pick_script, seven_day_rule_violated, ActionRuleEngine};
use rapport_core::domain::analysis::{ActionType, NextActionRecommendation};
use rapport_core::domain::contact::{AnalysisContext, ContactSnapshot, Timeframe};
use rapport_core::domain::stage::PipelineStage;

use crate::llm::{extract_json_object, CompletionRequest, InferenceClient};

const ACTION_SYSTEM_PROMPT: &str = "You recommend the single best next touch for a real-estate \
client relationship. Respond with a single JSON object and nothing else. action_type must be one \
of: Call, Text, Email, Meeting, Send Listing, Follow-up. urgency is an integer from 1 to 10.";

fn build_action_prompt(text: &str, context: &AnalysisContext) -> String {
    format!(
        "Contact: {name}\n\
        Stage: {stage}\n\
        Days since last contact: {days}\n\
        Motivation: {motivation}\n\
        Timeframe: {timeframe}\n\
        \n\
        Respond with JSON of exactly this shape:\n\
        {{\n\
        \x20 \"action_type\": \"Call\",\n\
        \x20 \"urgency\": 5,\n\
        \x20 \"script\": \"\",\n\
        \x20 \"rationale\": \"\",\n\
        \x20 \"behavioral_factors\": [],\n\
        \x20 \"estimated_timeframe\": \"\"\n\
        }}\n\
        \n\
        Conversation:\n{text}",
        name = context.contact_name,
        stage = context.current_stage,
        days = context.days_since_contact,
        motivation = context
            .motivation_level
            .map(|level| level.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        timeframe = context
            .timeframe
            .map(|range| range.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    )
}

#[derive(Debug, Default, Deserialize)]
struct WireAction {
    #[serde(default)]
    action_type: String,
    #[serde(default)]
    urgency: i64,
    #[serde(default)]
    script: String,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    behavioral_factors: Vec<String>,
    #[serde(default)]
    estimated_timeframe: String,
}

const FALLBACK_CHECK_IN_SCRIPTS: [&str; 2] = [
    "Hi {name}, just checking in. Anything I can help with on the housing front?",
    "Hi {name}, hope all is well! Happy to answer any questions whenever you are ready.",
];

/// Full-tier stage: next-action recommendation. When the collaborator fails,
/// a deterministic ladder takes over: the 7-day rule first and overriding,
/// then qualification for unassessed leads, then urgency for immediate
/// timeframes, then a generic low-pressure check-in.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionRecommender {
    rule_engine: ActionRuleEngine,
}

impl ActionRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn generate_next_action(
        &self,
        text: &str,
        context: &AnalysisContext,
        client: &dyn InferenceClient,
    ) -> NextActionRecommendation {
        let request =
            CompletionRequest::structured(ACTION_SYSTEM_PROMPT, build_action_prompt(text, context));
        match client.complete(&request).await {
            Ok(raw) => parse_action(&raw).unwrap_or_else(|| {
                warn!(task = "action_generation", "unparseable response; using rule fallback");
                self.fallback(context)
            }),
            Err(error) => {
                warn!(task = "action_generation", %error, "inference failed; using rule fallback");
                self.fallback(context)
            }
        }
    }

    fn fallback(&self, context: &AnalysisContext) -> NextActionRecommendation {
        let snapshot = snapshot_from_context(context);

        // The first three rungs coincide with rule-engine branches; delegate
        // so the scripts and rationales stay in one place.
        let seven_day =
            seven_day_rule_violated(context.current_stage, context.days_since_contact);
        let unqualified_lead =
            context.current_stage == PipelineStage::Lead && context.motivation_level.is_none();
        let immediate_new_opportunity = context.current_stage == PipelineStage::NewOpportunity
            && context.timeframe == Some(Timeframe::Immediate);

        if seven_day || unqualified_lead || immediate_new_opportunity {
            return self.rule_engine.recommend(&snapshot);
        }

        NextActionRecommendation {
            action_type: ActionType::Text,
            urgency: 5,
            script: pick_script(context.script_identifier(), &FALLBACK_CHECK_IN_SCRIPTS)
                .replace("{name}", context.first_name()),
            rationale: "Action generation unavailable; defaulting to a light check-in".to_string(),
            behavioral_factors: vec!["fallback".to_string()],
            estimated_timeframe: "This week".to_string(),
        }
    }
}

fn snapshot_from_context(context: &AnalysisContext) -> ContactSnapshot {
    ContactSnapshot {
        contact_id: context.script_identifier().to_string(),
        contact_name: context.contact_name.clone(),
        stage: context.current_stage,
        days_since_contact: context.days_since_contact,
        motivation_level: context.motivation_level,
        timeframe: context.timeframe,
        preapproved: false,
    }
}

fn parse_action(raw: &str) -> Option<NextActionRecommendation> {
    let json = extract_json_object(raw)?;
    let wire: WireAction = serde_json::from_str(json).ok()?;
    let action_type = ActionType::parse_loose(&wire.action_type)?;

    Some(NextActionRecommendation {
        action_type,
        urgency: clamp_urgency(wire.urgency.clamp(0, 100) as i32),
        script: wire.script,
        rationale: wire.rationale,
        behavioral_factors: wire.behavioral_factors,
        estimated_timeframe: wire.estimated_timeframe,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use rapport_core::domain::analysis::ActionType;
    use rapport_core::domain::contact::{AnalysisContext, MotivationLevel, Timeframe};
    use rapport_core::domain::stage::PipelineStage;

    use crate::llm::{CompletionRequest, InferenceClient};

    use super::ActionRecommender;

    struct StaticClient(&'static str);

    #[async_trait]
    impl InferenceClient for StaticClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl InferenceClient for FailingClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Err(anyhow!("inference service offline"))
        }
    }

    fn context(stage: PipelineStage, days_since_contact: u32) -> AnalysisContext {
        AnalysisContext {
            contact_id: Some("contact-7".to_string()),
            contact_name: "Riley Chen".to_string(),
            current_stage: stage,
            days_since_contact,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn generated_action_is_normalized_and_clamped() {
        let response = r#"{
            "action_type": "phone call",
            "urgency": 14,
            "script": "Hi Riley, quick call about the two listings?",
            "rationale": "buyer is close to deciding",
            "behavioral_factors": ["decision_imminent"],
            "estimated_timeframe": "Today"
        }"#;
        let recommender = ActionRecommender::new();
        let recommendation = recommender
            .generate_next_action(
                "we loved the second house",
                &context(PipelineStage::ActiveOpportunity, 1),
                &StaticClient(response),
            )
            .await;

        assert_eq!(recommendation.action_type, ActionType::Call);
        assert_eq!(recommendation.urgency, 10);
        assert!(recommendation.script.contains("Riley"));
    }

    #[tokio::test]
    async fn seven_day_violation_dominates_the_failure_fallback() {
        let recommender = ActionRecommender::new();
        let mut stale = context(PipelineStage::ActiveOpportunity, 7);
        stale.timeframe = Some(Timeframe::Immediate);

        let recommendation =
            recommender.generate_next_action("hello?", &stale, &FailingClient).await;

        assert_eq!(recommendation.action_type, ActionType::Call);
        assert_eq!(recommendation.urgency, 10);
        assert!(recommendation.rationale.contains("7-day rule"));
    }

    #[tokio::test]
    async fn unassessed_lead_falls_back_to_a_qualification_call() {
        let recommender = ActionRecommender::new();
        let recommendation = recommender
            .generate_next_action("hi there", &context(PipelineStage::Lead, 0), &FailingClient)
            .await;

        assert_eq!(recommendation.action_type, ActionType::Call);
        assert_eq!(recommendation.urgency, 7);
    }

    #[tokio::test]
    async fn immediate_new_opportunity_falls_back_to_an_urgent_call() {
        let recommender = ActionRecommender::new();
        let mut urgent = context(PipelineStage::NewOpportunity, 1);
        urgent.timeframe = Some(Timeframe::Immediate);

        let recommendation =
            recommender.generate_next_action("ready now", &urgent, &FailingClient).await;

        assert_eq!(recommendation.action_type, ActionType::Call);
        assert_eq!(recommendation.urgency, 8);
    }

    #[tokio::test]
    async fn everything_else_falls_back_to_a_generic_check_in() {
        let recommender = ActionRecommender::new();
        let mut qualified = context(PipelineStage::Lead, 1);
        qualified.motivation_level = Some(MotivationLevel::Medium);

        let recommendation =
            recommender.generate_next_action("thanks!", &qualified, &FailingClient).await;

        assert_eq!(recommendation.action_type, ActionType::Text);
        assert_eq!(recommendation.urgency, 5);
        assert!(recommendation.script.contains("Riley"));
    }

    #[tokio::test]
    async fn unparseable_action_type_uses_the_fallback_ladder() {
        let recommender = ActionRecommender::new();
        let response = r#"{"action_type": "smoke signal", "urgency": 5}"#;
        let recommendation = recommender
            .generate_next_action("hi", &context(PipelineStage::Lead, 0), &StaticClient(response))
            .await;

        // Lead without motivation: qualification call.
        assert_eq!(recommendation.action_type, ActionType::Call);
        assert_eq!(recommendation.urgency, 7);
    }
}
