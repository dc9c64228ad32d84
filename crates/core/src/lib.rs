pub mod actions;
pub mod config;
pub mod domain;
pub mod routing;
pub mod signals;
pub mod transitions;
pub mod usage;

pub use actions::{
    calculate_action_urgency, clamp_urgency, pick_script, seven_day_rule_violated,
    ActionRuleEngine, UrgencyFactors, SEVEN_DAY_RULE_THRESHOLD,
};
pub use domain::analysis::{
    ActionType, AnalysisMetadata, AnalysisResult, BudgetSignal, ExtractedEntities,
    MotivationSignal, NextActionRecommendation, PatternSignals, PropertyPreferences, QuickAnalysis,
    ReplyDraft, ReplyTone, StageDetectionResult, StageIndicators, SuggestedTransition,
    TimeframeSignal,
};
pub use domain::contact::{
    AnalysisContext, ContactSnapshot, ConversationChannel, MessageSender, MotivationLevel,
    Timeframe,
};
pub use domain::stage::PipelineStage;
pub use routing::{ModelRoute, ModelTier, TaskComplexity, TaskRouter, TaskType};
pub use signals::{
    classify_channel, extract_emails, extract_phone_numbers, extract_property_facts,
    quick_priority, PropertyFacts, SignalDetector, SignalDetectorConfig,
};
pub use transitions::{
    should_transition, stage_progression, transition_level, validate_stage_transition,
    TransitionCheck, TransitionLevel,
};
pub use usage::{UsageStats, UsageTracker};
