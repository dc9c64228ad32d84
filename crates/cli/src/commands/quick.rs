use serde::Serialize;

use rapport_core::domain::analysis::PatternSignals;
use rapport_core::domain::contact::ConversationChannel;
use rapport_core::signals::{
    classify_channel, extract_emails, extract_phone_numbers, extract_property_facts,
    quick_priority, PropertyFacts, SignalDetector,
};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct QuickReport {
    signals: PatternSignals,
    priority_score: u8,
    channel: ConversationChannel,
    phone_numbers: Vec<String>,
    emails: Vec<String>,
    property_facts: PropertyFacts,
}

pub fn run(text: &str) -> CommandResult {
    let detector = SignalDetector::default();
    let signals = detector.detect(text);
    let priority_score = quick_priority(&signals);

    let report = QuickReport {
        priority_score,
        channel: classify_channel(text),
        phone_numbers: extract_phone_numbers(text),
        emails: extract_emails(text),
        property_facts: extract_property_facts(text),
        signals,
    };

    CommandResult::success("quick", report)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn quick_report_serializes_signals_and_extras() {
        let result =
            run("Call 555-123-4567, we are pre-approved and want to buy ASAP, 3 bed under $400,000");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("\"priority_score\": 50"));
        assert!(result.output.contains("5551234567"));
        assert!(result.output.contains("\"beds\": 3"));
    }
}
