use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use rapport_core::domain::analysis::{AnalysisResult, QuickAnalysis};
use rapport_core::domain::contact::AnalysisContext;
use rapport_core::routing::{ModelRoute, ModelTier, TaskRouter, TaskType};
use rapport_core::signals::{SignalDetector, SignalDetectorConfig};
use rapport_core::usage::UsageTracker;

use crate::actions::ActionRecommender;
use crate::extraction::EntityExtractor;
use crate::llm::InferenceClient;
use crate::reply::ReplyDrafter;
use crate::stages::StageDetector;

/// Sequences the analysis stages, gates each behind the router, aggregates
/// partial results, and tracks usage on the injected tracker.
///
/// Tier gating: a stage executes only when the router's independently
/// computed tier for its task type equals the tier the stage is wired to
/// (rule-based for patterns, mini for entities, full for the rest). When they
/// disagree the stage is skipped silently and its zero-valued default stands;
/// there is deliberately no escalation to a more expensive tier.
pub struct AnalysisRuntime {
    router: TaskRouter,
    detector: SignalDetector,
    extractor: EntityExtractor,
    stage_detector: StageDetector,
    action_recommender: ActionRecommender,
    reply_drafter: ReplyDrafter,
    usage: UsageTracker,
    client: Arc<dyn InferenceClient>,
}

impl AnalysisRuntime {
    pub fn new(client: Arc<dyn InferenceClient>, usage: UsageTracker) -> Self {
        Self {
            router: TaskRouter::new(),
            detector: SignalDetector::default(),
            extractor: EntityExtractor::new(),
            stage_detector: StageDetector::new(),
            action_recommender: ActionRecommender::new(),
            reply_drafter: ReplyDrafter::new(),
            usage,
            client,
        }
    }

    pub fn with_detector_config(mut self, config: SignalDetectorConfig) -> Self {
        self.detector = SignalDetector::new(config);
        self
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Runs the full analysis chain. Never errors: every stage absorbs its
    /// own failures, so the worst case is a result full of typed defaults.
    pub async fn analyze(&self, text: &str, context: &AnalysisContext) -> AnalysisResult {
        let started = Instant::now();
        let mut result = AnalysisResult::default();
        result.metadata.analysis_id = Uuid::new_v4().to_string();

        // Pattern detection, wired to the rule-based tier.
        if let Some(route) = self.gate(TaskType::PatternDetection, text, ModelTier::RuleBased) {
            result.signals = self.detector.detect(text);
            self.record(&mut result, ModelTier::RuleBased, route.estimated_cost);
        }

        // Entity extraction, wired to the mini tier.
        if let Some(route) = self.gate(TaskType::EntityExtraction, text, ModelTier::Mini) {
            result.entities = self.extractor.extract(text, self.client.as_ref()).await;
            self.record(&mut result, ModelTier::Mini, route.estimated_cost);
        }

        // Stage detection, wired to the full tier.
        if let Some(route) = self.gate(TaskType::StageDetection, text, ModelTier::Full) {
            result.stage = self
                .stage_detector
                .detect_stage(text, Some(context.current_stage), self.client.as_ref())
                .await;
            self.record(&mut result, ModelTier::Full, route.estimated_cost);
        }

        // Action generation, wired to the full tier.
        if let Some(route) = self.gate(TaskType::ActionGeneration, text, ModelTier::Full) {
            result.next_action = self
                .action_recommender
                .generate_next_action(text, context, self.client.as_ref())
                .await;
            self.record(&mut result, ModelTier::Full, route.estimated_cost);
        }

        // Reply generation runs unless the caller opted out.
        if context.generate_reply.unwrap_or(true) {
            if let Some(route) = self.gate(TaskType::ReplyGeneration, text, ModelTier::Full) {
                let draft =
                    self.reply_drafter.generate_reply(text, context, self.client.as_ref()).await;
                result.reply = Some(draft);
                self.record(&mut result, ModelTier::Full, route.estimated_cost);
            }
        }

        result.metadata.overall_confidence = overall_confidence(&result);
        result.metadata.processing_time_ms = started.elapsed().as_millis() as u64;
        result.metadata.completed_at = Utc::now();
        result
    }

    /// Pattern-only fast path with a derived 0-100 priority score.
    pub fn quick_analyze(&self, text: &str) -> QuickAnalysis {
        let signals = self.detector.detect(text);
        let priority_score = rapport_core::signals::quick_priority(&signals);
        QuickAnalysis { signals, priority_score }
    }

    fn gate(&self, task_type: TaskType, text: &str, wired_tier: ModelTier) -> Option<ModelRoute> {
        let route = self.router.route(task_type, text);
        if route.tier == wired_tier {
            Some(route)
        } else {
            debug!(
                task = %task_type,
                routed = %route.tier,
                wired = %wired_tier,
                "router tier disagrees with wired tier; stage skipped"
            );
            None
        }
    }

    fn record(
        &self,
        result: &mut AnalysisResult,
        tier: ModelTier,
        estimated_cost: rust_decimal::Decimal,
    ) {
        self.usage.record(tier, estimated_cost);
        match tier {
            ModelTier::RuleBased => result.metadata.used_rule_based = true,
            ModelTier::Mini => result.metadata.used_mini = true,
            ModelTier::Full => result.metadata.used_full = true,
        }
        result.metadata.total_estimated_cost += estimated_cost;
    }
}

/// Rounded mean of the non-zero confidence signals. Zero-valued signals mark
/// stages that never ran (or found nothing) and are excluded so they do not
/// drag the average down; the result is 0 only when every signal is zero.
fn overall_confidence(result: &AnalysisResult) -> u8 {
    let terms = [
        u32::from(result.signals.confidence),
        u32::from(result.entities.motivation.confidence),
        u32::from(result.entities.timeframe.confidence),
        u32::from(result.stage.confidence),
        u32::from(result.next_action.urgency) * 10,
    ];

    let contributing: Vec<u32> = terms.into_iter().filter(|term| *term > 0).collect();
    if contributing.is_empty() {
        return 0;
    }
    let sum: u32 = contributing.iter().sum();
    (f64::from(sum) / contributing.len() as f64).round() as u8
}
