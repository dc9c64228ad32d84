use serde::{Deserialize, Serialize};

use crate::domain::analysis::{ActionType, NextActionRecommendation};
use crate::domain::contact::{ContactSnapshot, MotivationLevel, Timeframe};
use crate::domain::stage::PipelineStage;

/// Days of silence at Active Opportunity before the relationship is treated
/// as at risk.
pub const SEVEN_DAY_RULE_THRESHOLD: u32 = 7;

pub fn seven_day_rule_violated(stage: PipelineStage, days_since_contact: u32) -> bool {
    stage == PipelineStage::ActiveOpportunity && days_since_contact >= SEVEN_DAY_RULE_THRESHOLD
}

/// Inputs to the urgency formula, independent of how the caller obtained
/// them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyFactors {
    pub seven_day_rule_violation: bool,
    pub days_since_contact: u32,
    pub timeframe: Option<Timeframe>,
    pub motivation: Option<MotivationLevel>,
    pub stage: PipelineStage,
}

/// Urgency values live in 1..=10; anything outside is pulled to the nearest
/// bound. Shared by the rule engine and by parsing of generated output.
pub fn clamp_urgency(raw: i32) -> u8 {
    raw.clamp(1, 10) as u8
}

/// Additive urgency score, clamped into 1..=10. Base 5; the 7-day rule is
/// the single largest contributor.
pub fn calculate_action_urgency(factors: &UrgencyFactors) -> u8 {
    let mut score: i32 = 5;
    if factors.seven_day_rule_violation {
        score += 5;
    }
    if factors.days_since_contact >= 7 {
        score += 3;
    } else if factors.days_since_contact >= 3 {
        score += 1;
    }
    if factors.timeframe == Some(Timeframe::Immediate) {
        score += 2;
    }
    if factors.motivation == Some(MotivationLevel::High) {
        score += 1;
    }
    if factors.stage == PipelineStage::ActiveOpportunity {
        score += 1;
    }
    if factors.stage == PipelineStage::Closed {
        score -= 3;
    }
    clamp_urgency(score)
}

const REENGAGE_SCRIPTS: [&str; 3] = [
    "Hi {name}, it has been a little while! Any updates on your home search? A few new listings came up that I think you should see.",
    "Hi {name}, checking in. The market has moved since we last talked and I want to make sure you are not missing anything.",
    "{name}, I was reviewing your search this morning. Can we grab ten minutes today to regroup?",
];

const QUALIFICATION_SCRIPTS: [&str; 3] = [
    "Hi {name}, thanks for reaching out! To point you at the right homes, what area and price range are you focused on?",
    "Hi {name}, great to connect. Are you looking to make a move soon, or gathering information for later this year?",
    "Hi {name}! Quick question so I can help properly: have you spoken with a lender yet?",
];

const IMMEDIATE_TIMEFRAME_SCRIPTS: [&str; 2] = [
    "Hi {name}, since your timeline is short I pulled the strongest matches on the market right now. When can we talk today?",
    "{name}, with your timeframe we should move quickly. I have two homes worth seeing this week. Call me when you see this?",
];

const LISTING_SCRIPTS: [&str; 2] = [
    "Hi {name}, three new listings match what you described. Want me to set up showings for the ones you like?",
    "{name}, fresh batch of matches just hit the market. Take a look and tell me which ones stand out.",
];

const SHOWING_SCRIPTS: [&str; 2] = [
    "Hi {name}, let's lock in showing times while these homes are still available. What does your week look like?",
    "{name}, both homes we discussed are still active. Shall I schedule back-to-back tours?",
];

const CONTRACT_SCRIPTS: [&str; 2] = [
    "Hi {name}, quick milestone check on the contract: inspection and appraisal are the next gates. Any questions before then?",
    "Hi {name}, everything is tracking for closing. I will confirm the dates with the title company and keep you posted.",
];

const CHECK_IN_SCRIPTS: [&str; 3] = [
    "Hi {name}, just checking in. Anything I can help with on the housing front?",
    "Hi {name}, hope all is well! Let me know if any questions have come up.",
    "{name}, thinking about your plans. Want to catch up this week?",
];

const CLOSED_SCRIPTS: [&str; 2] = [
    "Hi {name}, congratulations again! How is the new place treating you?",
    "Hi {name}, happy home-iversary check-in. If friends or family ever need a hand with real estate, I am around.",
];

/// Deterministic next-action rules, no inference involved. Produces the same
/// recommendation shape as the generated path so callers can fall back
/// transparently.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionRuleEngine;

impl ActionRuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn recommend(&self, contact: &ContactSnapshot) -> NextActionRecommendation {
        // The 7-day rule outranks every stage branch.
        if seven_day_rule_violated(contact.stage, contact.days_since_contact) {
            return NextActionRecommendation {
                action_type: ActionType::Call,
                urgency: 10,
                script: personalize(
                    pick_script(&contact.contact_id, &REENGAGE_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: format!(
                    "7-day rule violated: {} days without contact at Active Opportunity",
                    contact.days_since_contact
                ),
                behavioral_factors: vec![
                    "seven_day_rule".to_string(),
                    "active_opportunity".to_string(),
                ],
                estimated_timeframe: "Today".to_string(),
            };
        }

        match contact.stage {
            PipelineStage::Lead => self.recommend_for_lead(contact),
            PipelineStage::NewOpportunity => self.recommend_for_new_opportunity(contact),
            PipelineStage::ActiveOpportunity => self.recommend_for_active_opportunity(contact),
            PipelineStage::UnderContract => self.recommend_for_under_contract(contact),
            PipelineStage::Closed => self.recommend_for_closed(contact),
        }
    }

    fn recommend_for_lead(&self, contact: &ContactSnapshot) -> NextActionRecommendation {
        if contact.motivation_level.is_none() {
            return NextActionRecommendation {
                action_type: ActionType::Call,
                urgency: 7,
                script: personalize(
                    pick_script(&contact.contact_id, &QUALIFICATION_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: "Lead has no assessed motivation; qualify by phone".to_string(),
                behavioral_factors: vec!["unqualified_lead".to_string()],
                estimated_timeframe: "Within 48 hours".to_string(),
            };
        }
        if contact.days_since_contact >= 5 {
            return NextActionRecommendation {
                action_type: ActionType::FollowUp,
                urgency: 6,
                script: personalize(
                    pick_script(&contact.contact_id, &CHECK_IN_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: format!(
                    "Qualified lead going quiet ({} days since contact)",
                    contact.days_since_contact
                ),
                behavioral_factors: vec!["lead_gone_quiet".to_string()],
                estimated_timeframe: "This week".to_string(),
            };
        }
        NextActionRecommendation {
            action_type: ActionType::Text,
            urgency: 4,
            script: personalize(
                pick_script(&contact.contact_id, &CHECK_IN_SCRIPTS),
                contact.first_name(),
            ),
            rationale: "Keep a light touch while the lead warms up".to_string(),
            behavioral_factors: vec!["nurture".to_string()],
            estimated_timeframe: "This week".to_string(),
        }
    }

    fn recommend_for_new_opportunity(&self, contact: &ContactSnapshot) -> NextActionRecommendation {
        if contact.timeframe == Some(Timeframe::Immediate) {
            return NextActionRecommendation {
                action_type: ActionType::Call,
                urgency: 8,
                script: personalize(
                    pick_script(&contact.contact_id, &IMMEDIATE_TIMEFRAME_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: "Immediate timeframe at New Opportunity; move to showings fast"
                    .to_string(),
                behavioral_factors: vec!["immediate_timeframe".to_string()],
                estimated_timeframe: "Today".to_string(),
            };
        }
        if contact.preapproved && contact.motivation_level == Some(MotivationLevel::High) {
            return NextActionRecommendation {
                action_type: ActionType::SendListing,
                urgency: 7,
                script: personalize(
                    pick_script(&contact.contact_id, &LISTING_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: "Pre-approved and highly motivated; listings convert to showings"
                    .to_string(),
                behavioral_factors: vec!["preapproved".to_string(), "high_motivation".to_string()],
                estimated_timeframe: "Within 24 hours".to_string(),
            };
        }
        if contact.days_since_contact >= 4 {
            return NextActionRecommendation {
                action_type: ActionType::Text,
                urgency: 6,
                script: personalize(
                    pick_script(&contact.contact_id, &CHECK_IN_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: format!(
                    "New opportunity cooling off ({} days since contact)",
                    contact.days_since_contact
                ),
                behavioral_factors: vec!["cooling_off".to_string()],
                estimated_timeframe: "Today".to_string(),
            };
        }
        NextActionRecommendation {
            action_type: ActionType::Email,
            urgency: 5,
            script: personalize(
                pick_script(&contact.contact_id, &LISTING_SCRIPTS),
                contact.first_name(),
            ),
            rationale: "Keep momentum with a curated listing email".to_string(),
            behavioral_factors: vec!["new_opportunity".to_string()],
            estimated_timeframe: "Within 2 days".to_string(),
        }
    }

    fn recommend_for_active_opportunity(
        &self,
        contact: &ContactSnapshot,
    ) -> NextActionRecommendation {
        if contact.timeframe == Some(Timeframe::Immediate) {
            return NextActionRecommendation {
                action_type: ActionType::Meeting,
                urgency: 8,
                script: personalize(
                    pick_script(&contact.contact_id, &SHOWING_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: "Active buyer on an immediate timeline; get showings on the calendar"
                    .to_string(),
                behavioral_factors: vec![
                    "immediate_timeframe".to_string(),
                    "active_opportunity".to_string(),
                ],
                estimated_timeframe: "Today".to_string(),
            };
        }
        if contact.days_since_contact >= 3 {
            return NextActionRecommendation {
                action_type: ActionType::Call,
                urgency: 7,
                script: personalize(
                    pick_script(&contact.contact_id, &REENGAGE_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: format!(
                    "Active opportunity needs a touch ({} days since contact)",
                    contact.days_since_contact
                ),
                behavioral_factors: vec!["active_opportunity".to_string()],
                estimated_timeframe: "Today".to_string(),
            };
        }
        NextActionRecommendation {
            action_type: ActionType::SendListing,
            urgency: 6,
            script: personalize(
                pick_script(&contact.contact_id, &LISTING_SCRIPTS),
                contact.first_name(),
            ),
            rationale: "Keep active search fed with fresh inventory".to_string(),
            behavioral_factors: vec!["active_opportunity".to_string()],
            estimated_timeframe: "Within 24 hours".to_string(),
        }
    }

    fn recommend_for_under_contract(&self, contact: &ContactSnapshot) -> NextActionRecommendation {
        if contact.days_since_contact >= 3 {
            return NextActionRecommendation {
                action_type: ActionType::Call,
                urgency: 7,
                script: personalize(
                    pick_script(&contact.contact_id, &CONTRACT_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: "Under contract and quiet; confirm milestone progress by phone"
                    .to_string(),
                behavioral_factors: vec!["under_contract".to_string()],
                estimated_timeframe: "Today".to_string(),
            };
        }
        NextActionRecommendation {
            action_type: ActionType::Email,
            urgency: 5,
            script: personalize(
                pick_script(&contact.contact_id, &CONTRACT_SCRIPTS),
                contact.first_name(),
            ),
            rationale: "Routine contract status update".to_string(),
            behavioral_factors: vec!["under_contract".to_string()],
            estimated_timeframe: "Within 2 days".to_string(),
        }
    }

    fn recommend_for_closed(&self, contact: &ContactSnapshot) -> NextActionRecommendation {
        if contact.days_since_contact >= 90 {
            return NextActionRecommendation {
                action_type: ActionType::Email,
                urgency: 3,
                script: personalize(
                    pick_script(&contact.contact_id, &CLOSED_SCRIPTS),
                    contact.first_name(),
                ),
                rationale: "Quarterly post-close relationship touch".to_string(),
                behavioral_factors: vec!["post_close".to_string()],
                estimated_timeframe: "This month".to_string(),
            };
        }
        NextActionRecommendation {
            action_type: ActionType::Text,
            urgency: 2,
            script: personalize(
                pick_script(&contact.contact_id, &CLOSED_SCRIPTS),
                contact.first_name(),
            ),
            rationale: "Recent close; a light thank-you keeps the referral door open".to_string(),
            behavioral_factors: vec!["post_close".to_string()],
            estimated_timeframe: "This week".to_string(),
        }
    }
}

/// Stable script choice for an identifier: seeded FNV-1a hash modulo the
/// list length. Reproducible across runs so tests and replays see the same
/// script for the same contact.
pub fn pick_script(identifier: &str, scripts: &[&str]) -> String {
    if scripts.is_empty() {
        return String::new();
    }
    let index = (fnv1a_64(identifier.as_bytes()) % scripts.len() as u64) as usize;
    scripts[index].to_string()
}

fn personalize(script: String, first_name: &str) -> String {
    script.replace("{name}", first_name)
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
