//! Cost-tier routing for analysis tasks.
//!
//! Pure heuristic, no inference calls: the router looks at the task type and
//! the raw text and decides which execution tier should handle the work. The
//! rule-based tier is free, the mini tier is a cheap structured call, the
//! full tier is the expensive reasoning/generation call. Cost estimates use
//! fixed per-million-token prices and fixed output-size assumptions so that
//! estimates are reproducible to the cent.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hedging phrasing that marks a message as ambiguous.
const HEDGING_WORDS: [&str; 9] = [
    "maybe",
    "possibly",
    "might",
    "could be",
    "not sure",
    "probably",
    "somewhat",
    "kind of",
    "sort of",
];

/// High-precision phrasing that the rule-based tier handles reliably on its
/// own. Deliberately tighter than the signal-detector categories.
static HIGH_CONFIDENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(want to buy|ready to buy|looking to buy|need to buy|want to sell|ready to sell|thinking of selling)\b")
            .expect("buying/selling phrasing regex"),
        Regex::new(r"(?i)\b(asap|urgent|immediately|right away)\b").expect("urgency words regex"),
        Regex::new(r"(?i)\b(schedule a (showing|tour)|see the (house|property|home)|open house)\b")
            .expect("showing visit regex"),
        Regex::new(r"(?i)\b(offer (was )?accepted|accepted (my|our|the) offer)\b")
            .expect("offer accepted regex"),
        Regex::new(r"(?i)\b(closed on the (house|home)|closing (date|day)|got the keys)\b")
            .expect("closing complete regex"),
        Regex::new(r"(?i)\bpre[- ]?approv(ed|al)\b").expect("preapproval phrasing regex"),
    ]
});

const MINI_OUTPUT_TOKEN_ASSUMPTION: u32 = 100;
const FULL_OUTPUT_TOKEN_ASSUMPTION: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    PatternDetection,
    EntityExtraction,
    StageDetection,
    ActionGeneration,
    ReplyGeneration,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternDetection => "pattern_detection",
            Self::EntityExtraction => "entity_extraction",
            Self::StageDetection => "stage_detection",
            Self::ActionGeneration => "action_generation",
            Self::ReplyGeneration => "reply_generation",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTier {
    RuleBased,
    Mini,
    Full,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleBased => "rule-based",
            Self::Mini => "mini",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral per-call complexity assessment. Computed fresh for every routing
/// decision and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComplexity {
    pub estimated_tokens: u32,
    pub has_ambiguity: bool,
    pub requires_reasoning: bool,
    pub requires_generation: bool,
    pub has_high_confidence_patterns: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRoute {
    pub tier: ModelTier,
    pub estimated_cost: Decimal,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TaskRouter;

impl TaskRouter {
    pub fn new() -> Self {
        Self
    }

    pub fn assess_complexity(&self, task_type: TaskType, text: &str) -> TaskComplexity {
        let normalized = text.to_ascii_lowercase();
        let estimated_tokens = estimate_tokens(text);
        let has_ambiguity = HEDGING_WORDS.iter().any(|word| normalized.contains(word));
        let requires_reasoning =
            matches!(task_type, TaskType::StageDetection | TaskType::ActionGeneration);
        let requires_generation = matches!(task_type, TaskType::ReplyGeneration);
        let has_high_confidence_patterns =
            HIGH_CONFIDENCE_PATTERNS.iter().any(|pattern| pattern.is_match(text));

        TaskComplexity {
            estimated_tokens,
            has_ambiguity,
            requires_reasoning,
            requires_generation,
            has_high_confidence_patterns,
        }
    }

    /// Total routing function: never fails, never does I/O.
    pub fn route(&self, task_type: TaskType, text: &str) -> ModelRoute {
        let complexity = self.assess_complexity(task_type, text);

        if task_type == TaskType::PatternDetection && complexity.has_high_confidence_patterns {
            return ModelRoute {
                tier: ModelTier::RuleBased,
                estimated_cost: Decimal::ZERO,
                reason: "high-confidence patterns present; rule-based matching is reliable"
                    .to_string(),
            };
        }

        if !complexity.requires_reasoning && !complexity.requires_generation {
            return ModelRoute {
                tier: ModelTier::Mini,
                estimated_cost: mini_cost(complexity.estimated_tokens),
                reason: format!(
                    "{task_type} needs structured output only (~{} input tokens)",
                    complexity.estimated_tokens
                ),
            };
        }

        ModelRoute {
            tier: ModelTier::Full,
            estimated_cost: full_cost(complexity.estimated_tokens),
            reason: format!(
                "{task_type} requires {} (~{} input tokens)",
                if complexity.requires_generation { "generation" } else { "reasoning" },
                complexity.estimated_tokens
            ),
        }
    }
}

/// ceil(character length / 4); the collaborator bills by token and four
/// characters per token is the standing approximation.
pub fn estimate_tokens(text: &str) -> u32 {
    let length = u32::try_from(text.len()).unwrap_or(u32::MAX);
    length.div_ceil(4)
}

// Mini tier: $0.15 per 1M input tokens, $0.60 per 1M output tokens, with a
// fixed 100-token output assumption.
fn mini_cost(input_tokens: u32) -> Decimal {
    let per_million = Decimal::from(1_000_000u32);
    Decimal::from(input_tokens) * Decimal::new(15, 2) / per_million
        + Decimal::from(MINI_OUTPUT_TOKEN_ASSUMPTION) * Decimal::new(60, 2) / per_million
}

// Full tier: $2.50 per 1M input tokens, $10.00 per 1M output tokens, with a
// fixed 500-token output assumption.
fn full_cost(input_tokens: u32) -> Decimal {
    let per_million = Decimal::from(1_000_000u32);
    Decimal::from(input_tokens) * Decimal::new(250, 2) / per_million
        + Decimal::from(FULL_OUTPUT_TOKEN_ASSUMPTION) * Decimal::new(1000, 2) / per_million
}
