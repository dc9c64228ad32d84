use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::stage::PipelineStage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotivationLevel {
    High,
    Medium,
    Low,
}

impl MotivationLevel {
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.contains("high") || normalized.contains("hot") {
            return Some(Self::High);
        }
        if normalized.contains("medium") || normalized.contains("moderate") {
            return Some(Self::Medium);
        }
        if normalized.contains("low") || normalized.contains("cold") {
            return Some(Self::Low);
        }
        None
    }
}

impl fmt::Display for MotivationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Expected purchase/sale horizon. Canonical display strings are part of the
/// result contract and must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    Immediate,
    OneToThreeMonths,
    ThreeToSixMonths,
    SixPlusMonths,
}

impl Timeframe {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Immediate => "Immediate",
            Self::OneToThreeMonths => "1-3 months",
            Self::ThreeToSixMonths => "3-6 months",
            Self::SixPlusMonths => "6+ months",
        }
    }

    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }
        let immediate_hints = ["immediate", "asap", "right now", "right away", "this week"];
        if immediate_hints.iter().any(|hint| normalized.contains(hint)) {
            return Some(Self::Immediate);
        }
        if normalized.contains("1-3")
            || normalized.contains("1 to 3")
            || normalized.contains("next month")
        {
            return Some(Self::OneToThreeMonths);
        }
        if normalized.contains("3-6") || normalized.contains("3 to 6") {
            return Some(Self::ThreeToSixMonths);
        }
        if normalized.contains("6+")
            || normalized.contains("6 months or more")
            || normalized.contains("next year")
            || normalized.contains("eventually")
        {
            return Some(Self::SixPlusMonths);
        }
        None
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    Contact,
    Agent,
}

/// Source channel a conversation transcript was captured from. Classification
/// is heuristic; `Generic` is the safe default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationChannel {
    Ios,
    Android,
    WhatsApp,
    Generic,
}

impl Default for ConversationChannel {
    fn default() -> Self {
        Self::Generic
    }
}

/// Caller-supplied, read-only context for one analysis invocation. The
/// analysis never mutates it and never persists it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub contact_id: Option<String>,
    pub contact_name: String,
    pub current_stage: PipelineStage,
    pub motivation_level: Option<MotivationLevel>,
    pub timeframe: Option<Timeframe>,
    pub days_since_contact: u32,
    pub last_message_from: Option<MessageSender>,
    pub conversation_type: Option<ConversationChannel>,
    pub generate_reply: Option<bool>,
}

impl AnalysisContext {
    pub fn first_name(&self) -> &str {
        self.contact_name.split_whitespace().next().unwrap_or("there")
    }

    /// Identifier used for deterministic script selection: the contact id
    /// when present, the display name otherwise.
    pub fn script_identifier(&self) -> &str {
        self.contact_id.as_deref().unwrap_or(&self.contact_name)
    }
}

/// Flattened contact record consumed by the deterministic next-action rule
/// engine. Built by the caller from whatever store it owns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub contact_id: String,
    pub contact_name: String,
    pub stage: PipelineStage,
    pub days_since_contact: u32,
    pub motivation_level: Option<MotivationLevel>,
    pub timeframe: Option<Timeframe>,
    pub preapproved: bool,
}

impl ContactSnapshot {
    pub fn first_name(&self) -> &str {
        self.contact_name.split_whitespace().next().unwrap_or("there")
    }
}
