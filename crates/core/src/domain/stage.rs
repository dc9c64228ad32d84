use std::fmt;

use serde::{Deserialize, Serialize};

/// The five canonical relationship states a contact moves through, in
/// pipeline order. The ordering is load-bearing: progression and regression
/// are computed from each stage's index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Lead,
    NewOpportunity,
    ActiveOpportunity,
    UnderContract,
    Closed,
}

pub const STAGE_ORDER: [PipelineStage; 5] = [
    PipelineStage::Lead,
    PipelineStage::NewOpportunity,
    PipelineStage::ActiveOpportunity,
    PipelineStage::UnderContract,
    PipelineStage::Closed,
];

impl PipelineStage {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::NewOpportunity => "New Opportunity",
            Self::ActiveOpportunity => "Active Opportunity",
            Self::UnderContract => "Under Contract",
            Self::Closed => "Closed",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Lead => 0,
            Self::NewOpportunity => 1,
            Self::ActiveOpportunity => 2,
            Self::UnderContract => 3,
            Self::Closed => 4,
        }
    }

    /// Best-effort stage recognition for free-text labels coming back from
    /// the inference collaborator. Case-insensitive substring containment;
    /// more specific names are tested before their substrings.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }
        if normalized.contains("active") {
            return Some(Self::ActiveOpportunity);
        }
        if normalized.contains("contract") {
            return Some(Self::UnderContract);
        }
        if normalized.contains("closed") || normalized.contains("close") {
            return Some(Self::Closed);
        }
        if normalized.contains("new") || normalized.contains("opportunity") {
            return Some(Self::NewOpportunity);
        }
        if normalized.contains("lead") {
            return Some(Self::Lead);
        }
        None
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl Default for PipelineStage {
    fn default() -> Self {
        Self::Lead
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineStage, STAGE_ORDER};

    #[test]
    fn stage_order_indexes_are_monotonic() {
        for (position, stage) in STAGE_ORDER.iter().enumerate() {
            assert_eq!(stage.index(), position);
        }
    }

    #[test]
    fn canonical_names_round_trip_through_loose_parsing() {
        for stage in STAGE_ORDER {
            assert_eq!(PipelineStage::parse_loose(stage.canonical_name()), Some(stage));
        }
    }

    #[test]
    fn loose_parsing_accepts_model_phrasing_variants() {
        assert_eq!(
            PipelineStage::parse_loose("the contact is an ACTIVE opportunity"),
            Some(PipelineStage::ActiveOpportunity)
        );
        assert_eq!(
            PipelineStage::parse_loose("under contract"),
            Some(PipelineStage::UnderContract)
        );
        assert_eq!(PipelineStage::parse_loose("closed won"), Some(PipelineStage::Closed));
        assert_eq!(
            PipelineStage::parse_loose("new opportunity"),
            Some(PipelineStage::NewOpportunity)
        );
        assert_eq!(PipelineStage::parse_loose("cold lead"), Some(PipelineStage::Lead));
    }

    #[test]
    fn unrecognized_labels_yield_none() {
        assert_eq!(PipelineStage::parse_loose(""), None);
        assert_eq!(PipelineStage::parse_loose("prospect"), None);
    }
}
