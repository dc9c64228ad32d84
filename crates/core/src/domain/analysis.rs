use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::contact::{MotivationLevel, Timeframe};
use crate::domain::stage::PipelineStage;

/// Zero-cost behavioral flags derived from text matching alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSignals {
    pub buying_intent: bool,
    pub selling_intent: bool,
    pub urgency: bool,
    pub specific_property: bool,
    pub preapproval: bool,
    pub showings: bool,
    pub offer_accepted: bool,
    pub closing: bool,
    pub confidence: u8,
    pub matched_patterns: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationSignal {
    pub level: Option<MotivationLevel>,
    pub confidence: u8,
    pub indicators: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeSignal {
    pub range: Option<Timeframe>,
    pub confidence: u8,
    pub indicators: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPreferences {
    pub location: Option<String>,
    pub price_range: Option<String>,
    pub property_type: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub must_haves: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSignal {
    pub range: Option<String>,
    pub preapproved: bool,
    pub mentioned: bool,
}

/// Structured attributes pulled out of the conversation by the mini tier.
/// Every field defaults to absent; a failed extraction yields the default
/// value rather than an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub motivation: MotivationSignal,
    pub timeframe: TimeframeSignal,
    pub property_preferences: PropertyPreferences,
    pub budget: BudgetSignal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTransition {
    pub from: PipelineStage,
    pub to: PipelineStage,
    pub confidence: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageIndicators {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDetectionResult {
    pub current_stage: PipelineStage,
    pub confidence: u8,
    pub reasoning: String,
    pub suggested_transition: Option<SuggestedTransition>,
    pub indicators: StageIndicators,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Call,
    Text,
    Email,
    Meeting,
    SendListing,
    FollowUp,
}

impl ActionType {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Text => "Text",
            Self::Email => "Email",
            Self::Meeting => "Meeting",
            Self::SendListing => "Send Listing",
            Self::FollowUp => "Follow-up",
        }
    }

    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.contains("call") || normalized.contains("phone") {
            return Some(Self::Call);
        }
        if normalized.contains("listing") {
            return Some(Self::SendListing);
        }
        if normalized.contains("text") || normalized.contains("sms") {
            return Some(Self::Text);
        }
        if normalized.contains("email") {
            return Some(Self::Email);
        }
        if normalized.contains("meet") || normalized.contains("appointment") {
            return Some(Self::Meeting);
        }
        if normalized.contains("follow") {
            return Some(Self::FollowUp);
        }
        None
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl Default for ActionType {
    fn default() -> Self {
        Self::FollowUp
    }
}

/// Recommended next touch for the relationship. Urgency 1-10 after clamping;
/// the zero-valued default (urgency 0) marks a stage that never ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextActionRecommendation {
    pub action_type: ActionType,
    pub urgency: u8,
    pub script: String,
    pub rationale: String,
    pub behavioral_factors: Vec<String>,
    pub estimated_timeframe: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyTone {
    Professional,
    Friendly,
    Urgent,
    Casual,
}

impl ReplyTone {
    /// Substring normalization against the four canonical tones; anything
    /// unrecognized maps to Professional.
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.contains("friend") {
            return Self::Friendly;
        }
        if normalized.contains("urgent") {
            return Self::Urgent;
        }
        if normalized.contains("casual") {
            return Self::Casual;
        }
        Self::Professional
    }
}

impl fmt::Display for ReplyTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Professional => "Professional",
            Self::Friendly => "Friendly",
            Self::Urgent => "Urgent",
            Self::Casual => "Casual",
        };
        f.write_str(label)
    }
}

impl Default for ReplyTone {
    fn default() -> Self {
        Self::Professional
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub greeting: String,
    pub acknowledgment: String,
    pub value_proposition: String,
    pub next_step: String,
    pub closing: String,
    pub full_reply: String,
    pub tone: ReplyTone,
    pub edit_suggestions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_id: String,
    pub total_estimated_cost: Decimal,
    pub used_rule_based: bool,
    pub used_mini: bool,
    pub used_full: bool,
    pub processing_time_ms: u64,
    pub overall_confidence: u8,
    pub completed_at: DateTime<Utc>,
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            analysis_id: String::new(),
            total_estimated_cost: Decimal::ZERO,
            used_rule_based: false,
            used_mini: false,
            used_full: false,
            processing_time_ms: 0,
            overall_confidence: 0,
            completed_at: Utc::now(),
        }
    }
}

/// Aggregate of everything one analysis produced. Always fully populated:
/// stages that were skipped or degraded leave their zero-valued defaults in
/// place, never a hole.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub signals: PatternSignals,
    pub entities: ExtractedEntities,
    pub stage: StageDetectionResult,
    pub next_action: NextActionRecommendation,
    pub reply: Option<ReplyDraft>,
    pub metadata: AnalysisMetadata,
}

/// Output of the pattern-only fast path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAnalysis {
    pub signals: PatternSignals,
    pub priority_score: u8,
}
