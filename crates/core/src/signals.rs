use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::analysis::PatternSignals;
use crate::domain::contact::ConversationChannel;

// Category regexes, one per behavioral signal. Evaluated in the fixed order
// given by `detect`; each match appends its tag to `matched_patterns`.

static BUYING_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(buy|buying|purchase|purchasing|looking (for|to buy|at homes)|house hunt(ing)?|find (a|our|my) (home|house|place)|first[- ]time buyer)\b",
    )
    .expect("buying intent regex")
});

static SELLING_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(sell|selling|list (my|our|the) (house|home|property|place)|listing appointment|put (it|the house|our home) on the market|what('s| is) (my|our) (house|home) worth)\b",
    )
    .expect("selling intent regex")
});

static URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(asap|urgent(ly)?|immediately|right away|right now|as soon as possible|this week(end)?|today or tomorrow|need to move (fast|quickly))\b",
    )
    .expect("urgency regex")
});

static SPECIFIC_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+\s*(?:bed|bedroom|bath|bathroom)s?\b|\$\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?[km]?\b|\b\d+\s+[a-z]+\s+(?:st|street|ave|avenue|rd|road|dr|drive|ln|lane|blvd|boulevard|ct|court|way)\b|\bmls\s*#?\s*\d+)",
    )
    .expect("specific property regex")
});

static PREAPPROVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bpre[- ]?approv(?:ed|al)\b|\bpre[- ]?qualif(?:ied|ication)\b")
        .expect("preapproval regex")
});

static SHOWINGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(showing|show me|tour|open house|walk[- ]?through|(see|view|visit) (the|that|this) (house|home|property|place))\b",
    )
    .expect("showings regex")
});

static OFFER_ACCEPTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(offer (was |got |is )?accepted|accepted (my|our|the) offer|they took (my|our) offer|signed the (contract|purchase agreement)|under contract)\b",
    )
    .expect("offer accepted regex")
});

static CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(clos(?:ing|ed) (?:date|day|week|on the (?:house|home)|escrow)|settlement date|final walk[- ]?through|got the keys|keys in hand)\b",
    )
    .expect("closing regex")
});

static PHONE_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\(\d{3}\)\s*\d{3}[-.\s]?\d{4}").expect("parenthesized phone regex"),
        Regex::new(r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b").expect("delimited phone regex"),
        Regex::new(r"\b\+?1?\d{10}\b").expect("bare digits phone regex"),
    ]
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

static BEDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:bed|bedroom|br)s?\b").expect("beds regex"));
static BATHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:bath|bathroom|ba)s?\b").expect("baths regex")
});
static PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?[kKmM]?").expect("price regex")
});
static SQFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s*(?:sq\.?\s?ft\.?|sqft|square feet)").expect("sqft regex")
});

static WHATSAPP_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\[\d{1,2}/\d{1,2}/\d{2,4},?\s+\d{1,2}:\d{2}").expect("whatsapp stamp regex")
});
static IOS_RECEIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(Delivered|Read)\s*$|\bToday \d{1,2}:\d{2}\s?(AM|PM)")
        .expect("ios receipt regex")
});
static ANDROID_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\d{1,2}:\d{2}\s?(AM|PM)\s*[-–]").expect("android stamp regex")
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDetectorConfig {
    /// Minimum staircase confidence for `is_sufficient`.
    pub sufficiency_threshold: u8,
}

impl Default for SignalDetectorConfig {
    fn default() -> Self {
        Self { sufficiency_threshold: 80 }
    }
}

/// Rule-based tier of the analysis pipeline: free to run, no collaborator
/// calls, deterministic output.
#[derive(Clone, Debug, Default)]
pub struct SignalDetector {
    config: SignalDetectorConfig,
}

impl SignalDetector {
    pub fn new(config: SignalDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalDetectorConfig {
        &self.config
    }

    pub fn detect(&self, text: &str) -> PatternSignals {
        let mut signals = PatternSignals {
            buying_intent: BUYING_INTENT.is_match(text),
            selling_intent: SELLING_INTENT.is_match(text),
            urgency: URGENCY.is_match(text),
            specific_property: SPECIFIC_PROPERTY.is_match(text),
            preapproval: PREAPPROVAL.is_match(text),
            showings: SHOWINGS.is_match(text),
            offer_accepted: OFFER_ACCEPTED.is_match(text),
            closing: CLOSING.is_match(text),
            ..Default::default()
        };

        let categories = [
            ("buying_intent", signals.buying_intent),
            ("selling_intent", signals.selling_intent),
            ("urgency", signals.urgency),
            ("specific_property", signals.specific_property),
            ("preapproval", signals.preapproval),
            ("showings", signals.showings),
            ("offer_accepted", signals.offer_accepted),
            ("closing", signals.closing),
        ];
        let matched_patterns: Vec<String> = categories
            .into_iter()
            .filter(|(_, matched)| *matched)
            .map(|(tag, _)| tag.to_string())
            .collect();

        signals.confidence = staircase_confidence(matched_patterns.len());
        signals.matched_patterns = matched_patterns;
        signals
    }

    /// True when pattern matching alone is trustworthy enough that downstream
    /// tiers can be skipped by the caller.
    pub fn is_sufficient(&self, text: &str) -> bool {
        self.detect(text).confidence >= self.config.sufficiency_threshold
    }
}

/// Confidence over the count of distinct matched categories. Deliberately a
/// staircase, not a ratio: two independent categories agreeing is worth far
/// more than one, and the curve saturates at 95.
fn staircase_confidence(matched_categories: usize) -> u8 {
    match matched_categories {
        0 => 0,
        1 => 70,
        2 => 80,
        3 => 90,
        _ => 95,
    }
}

/// Priority score for the pattern-only fast path: additive weights over the
/// high-value signals, capped at 100.
pub fn quick_priority(signals: &PatternSignals) -> u8 {
    let mut priority: u32 = 0;
    if signals.urgency {
        priority += 30;
    }
    if signals.buying_intent || signals.selling_intent {
        priority += 20;
    }
    if signals.showings {
        priority += 15;
    }
    if signals.offer_accepted {
        priority += 25;
    }
    if signals.closing {
        priority += 10;
    }
    priority.min(100) as u8
}

/// Pulls phone numbers out of free text. Three overlapping shapes are
/// tolerated; results are normalized to digit strings and deduplicated, and
/// anything shorter than 10 digits is discarded.
pub fn extract_phone_numbers(text: &str) -> Vec<String> {
    let mut numbers = BTreeSet::new();
    for shape in PHONE_SHAPES.iter() {
        for capture in shape.find_iter(text) {
            let digits: String =
                capture.as_str().chars().filter(|character| character.is_ascii_digit()).collect();
            if digits.len() >= 10 {
                numbers.insert(digits);
            }
        }
    }
    numbers.into_iter().collect()
}

pub fn extract_emails(text: &str) -> Vec<String> {
    EMAIL.find_iter(text).map(|capture| capture.as_str().to_string()).collect()
}

/// Property facts lifted from text. Only the first match per category is
/// kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFacts {
    pub beds: Option<u32>,
    pub baths: Option<f64>,
    pub price: Option<String>,
    pub sqft: Option<u32>,
}

pub fn extract_property_facts(text: &str) -> PropertyFacts {
    let beds = BEDS
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok());
    let baths = BATHS
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok());
    let price = PRICE.find(text).map(|capture| capture.as_str().trim().to_string());
    let sqft = SQFT
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().replace(',', "").parse().ok());

    PropertyFacts { beds, baths, price, sqft }
}

/// Classifies which messaging surface a transcript came from. Checks are
/// mutually exclusive and ordered; anything unrecognized is `Generic`.
pub fn classify_channel(text: &str) -> ConversationChannel {
    let normalized = text.to_ascii_lowercase();
    if normalized.contains("whatsapp") || WHATSAPP_TIMESTAMP.is_match(text) {
        return ConversationChannel::WhatsApp;
    }
    if normalized.contains("imessage") || IOS_RECEIPT.is_match(text) {
        return ConversationChannel::Ios;
    }
    if normalized.contains("(sms)") || ANDROID_TIMESTAMP.is_match(text) {
        return ConversationChannel::Android;
    }
    ConversationChannel::Generic
}

#[cfg(test)]
mod tests {
    use crate::domain::contact::ConversationChannel;

    use super::{
        classify_channel, extract_emails, extract_phone_numbers, extract_property_facts,
        SignalDetector, SignalDetectorConfig,
    };

    #[test]
    fn four_category_buyer_message_hits_the_staircase_ceiling() {
        let detector = SignalDetector::default();
        let signals = detector.detect(
            "I need to buy a house ASAP, pre-approved already, looking in 3 bedroom homes under $400,000",
        );

        assert!(signals.buying_intent);
        assert!(signals.urgency);
        assert!(signals.preapproval);
        assert!(signals.specific_property);
        assert!(!signals.selling_intent);
        assert!(!signals.showings);
        assert!(!signals.offer_accepted);
        assert!(!signals.closing);
        assert_eq!(signals.matched_patterns.len(), 4);
        assert_eq!(signals.confidence, 95);
    }

    #[test]
    fn staircase_depends_on_category_count_not_identity() {
        let detector = SignalDetector::default();

        let one = detector.detect("We want to sell in the spring.");
        assert_eq!(one.matched_patterns, vec!["selling_intent".to_string()]);
        assert_eq!(one.confidence, 70);

        let two = detector.detect("Can we tour the open house? We are pre-approved.");
        assert_eq!(two.matched_patterns.len(), 2);
        assert_eq!(two.confidence, 80);

        let three = detector.detect("Our offer was accepted! Closing date is set, keys in hand soon, and we want to buy again someday.");
        assert!(three.confidence >= 90);

        let silent = detector.detect("Thanks for the chat yesterday.");
        assert_eq!(silent.confidence, 0);
        assert!(silent.matched_patterns.is_empty());
    }

    #[test]
    fn sufficiency_uses_the_configured_threshold() {
        let detector = SignalDetector::default();
        assert!(detector.is_sufficient("Pre-approved and ready to tour the open house"));
        assert!(!detector.is_sufficient("We want to sell eventually"));

        let strict = SignalDetector::new(SignalDetectorConfig { sufficiency_threshold: 95 });
        assert!(!strict.is_sufficient("Pre-approved and ready to tour the open house"));
    }

    #[test]
    fn phone_extraction_dedupes_overlapping_shapes() {
        let merged = extract_phone_numbers("Call 555-123-4567 or 5551234567");
        assert_eq!(merged, vec!["5551234567".to_string()]);

        let distinct = extract_phone_numbers("Call 555-123-4567 or 555-999-8888");
        assert_eq!(
            distinct,
            vec!["5551234567".to_string(), "5559998888".to_string()]
        );
    }

    #[test]
    fn phone_extraction_discards_short_fragments() {
        assert!(extract_phone_numbers("Extension 12345, room 555-12").is_empty());
        assert_eq!(
            extract_phone_numbers("(555) 123-4567 works best"),
            vec!["5551234567".to_string()]
        );
    }

    #[test]
    fn email_extraction_is_syntactic_only() {
        let emails = extract_emails("Reach me at jordan.lee@example.com or team@broker.co");
        assert_eq!(
            emails,
            vec!["jordan.lee@example.com".to_string(), "team@broker.co".to_string()]
        );
        assert!(extract_emails("no address here").is_empty());
    }

    #[test]
    fn property_facts_keep_only_the_first_match_per_category() {
        let facts = extract_property_facts(
            "Looking at a 3 bedroom, 2.5 bath place around $450,000, maybe 4 bed later, 1,800 sqft",
        );
        assert_eq!(facts.beds, Some(3));
        assert_eq!(facts.baths, Some(2.5));
        assert_eq!(facts.price.as_deref(), Some("$450,000"));
        assert_eq!(facts.sqft, Some(1_800));

        assert_eq!(extract_property_facts("just saying hi"), Default::default());
    }

    #[test]
    fn channel_classification_heuristics_are_mutually_exclusive() {
        let whatsapp = "[1/14/24, 10:32] Sam: pricing looks good";
        assert_eq!(classify_channel(whatsapp), ConversationChannel::WhatsApp);

        let ios = "Sam: see you there\nDelivered\n";
        assert_eq!(classify_channel(ios), ConversationChannel::Ios);

        let android = "10:32 AM - Sam: see you there";
        assert_eq!(classify_channel(android), ConversationChannel::Android);

        assert_eq!(classify_channel("plain transcript"), ConversationChannel::Generic);
    }
}
