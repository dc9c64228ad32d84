use std::collections::HashMap;

use futures::future;
use serde::Deserialize;
use tracing::warn;

use rapport_core::domain::analysis::{
    BudgetSignal, ExtractedEntities, MotivationSignal, PropertyPreferences, TimeframeSignal,
};
use rapport_core::domain::contact::{MotivationLevel, Timeframe};

use crate::llm::{clamp_confidence, extract_json_object, CompletionRequest, InferenceClient};

/// Items per batch chunk. Chunks run strictly in sequence; items within a
/// chunk run concurrently.
pub const BATCH_CHUNK_SIZE: usize = 5;

const EXTRACTION_SYSTEM_PROMPT: &str = "You extract structured facts from real-estate client \
conversations. Respond with a single JSON object and nothing else. Use null for anything the \
conversation does not support.";

fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Extract four categories from the conversation below.\n\
        Respond with JSON of exactly this shape:\n\
        {{\n\
        \x20 \"motivation\": {{\"level\": \"High|Medium|Low|null\", \"confidence\": 0, \"indicators\": []}},\n\
        \x20 \"timeframe\": {{\"range\": \"Immediate|1-3 months|3-6 months|6+ months|null\", \"confidence\": 0, \"indicators\": []}},\n\
        \x20 \"property_preferences\": {{\"location\": null, \"price_range\": null, \"property_type\": null, \"beds\": null, \"baths\": null, \"must_haves\": []}},\n\
        \x20 \"budget\": {{\"range\": null, \"preapproved\": false, \"mentioned\": false}}\n\
        }}\n\
        \n\
        Conversation:\n{text}"
    )
}

#[derive(Debug, Default, Deserialize)]
struct WireEntities {
    #[serde(default)]
    motivation: WireMotivation,
    #[serde(default)]
    timeframe: WireTimeframe,
    #[serde(default)]
    property_preferences: WirePreferences,
    #[serde(default)]
    budget: WireBudget,
}

#[derive(Debug, Default, Deserialize)]
struct WireMotivation {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    confidence: i64,
    #[serde(default)]
    indicators: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireTimeframe {
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    confidence: i64,
    #[serde(default)]
    indicators: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePreferences {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    price_range: Option<String>,
    #[serde(default)]
    property_type: Option<String>,
    #[serde(default)]
    beds: Option<u32>,
    #[serde(default)]
    baths: Option<f64>,
    #[serde(default)]
    must_haves: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireBudget {
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    preapproved: bool,
    #[serde(default)]
    mentioned: bool,
}

impl WireEntities {
    /// Normalizes the wire shape into the domain shape: confidences clamped
    /// into 0..=100, free-text levels and ranges mapped onto canonical enums
    /// by loose containment.
    fn into_domain(self) -> ExtractedEntities {
        ExtractedEntities {
            motivation: MotivationSignal {
                level: self.motivation.level.as_deref().and_then(MotivationLevel::parse_loose),
                confidence: clamp_confidence(self.motivation.confidence),
                indicators: self.motivation.indicators,
            },
            timeframe: TimeframeSignal {
                range: self.timeframe.range.as_deref().and_then(Timeframe::parse_loose),
                confidence: clamp_confidence(self.timeframe.confidence),
                indicators: self.timeframe.indicators,
            },
            property_preferences: PropertyPreferences {
                location: self.property_preferences.location,
                price_range: self.property_preferences.price_range,
                property_type: self.property_preferences.property_type,
                beds: self.property_preferences.beds,
                baths: self.property_preferences.baths,
                must_haves: self.property_preferences.must_haves,
            },
            budget: BudgetSignal {
                range: self.budget.range,
                preapproved: self.budget.preapproved,
                mentioned: self.budget.mentioned,
            },
        }
    }
}

fn parse_entities(raw: &str) -> Option<ExtractedEntities> {
    let json = extract_json_object(raw)?;
    let wire: WireEntities = serde_json::from_str(json).ok()?;
    Some(wire.into_domain())
}

/// One item in a batch extraction request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchItem {
    pub id: String,
    pub text: String,
}

/// Mini-tier stage: structured attribute extraction. Infallible by contract;
/// any collaborator failure degrades to `ExtractedEntities::default()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub async fn extract(&self, text: &str, client: &dyn InferenceClient) -> ExtractedEntities {
        let request =
            CompletionRequest::structured(EXTRACTION_SYSTEM_PROMPT, build_extraction_prompt(text));
        match client.complete(&request).await {
            Ok(raw) => parse_entities(&raw).unwrap_or_else(|| {
                warn!(task = "entity_extraction", "unparseable response; using defaults");
                ExtractedEntities::default()
            }),
            Err(error) => {
                warn!(task = "entity_extraction", %error, "inference failed; using defaults");
                ExtractedEntities::default()
            }
        }
    }

    /// Extracts entities for many conversations. Chunks of
    /// [`BATCH_CHUNK_SIZE`] are processed strictly in order; items inside a
    /// chunk run concurrently. A failure on one item degrades only that item
    /// (per-item isolation comes from `extract` itself being infallible).
    pub async fn batch_extract(
        &self,
        items: &[BatchItem],
        client: &dyn InferenceClient,
    ) -> HashMap<String, ExtractedEntities> {
        let mut results = HashMap::with_capacity(items.len());
        for chunk in items.chunks(BATCH_CHUNK_SIZE) {
            let extracted = future::join_all(chunk.iter().map(|item| async move {
                (item.id.clone(), self.extract(&item.text, client).await)
            }))
            .await;
            results.extend(extracted);
        }
        results
    }
}

/// Aggregate confidence over whichever attribute signals are actually
/// present: motivation and timeframe contribute their own confidences, a
/// mentioned budget contributes 50, a known location 30, a bed count 20.
/// Zero-valued terms are dropped before averaging.
pub fn entity_confidence(entities: &ExtractedEntities) -> u8 {
    let terms = [
        u32::from(entities.motivation.confidence),
        u32::from(entities.timeframe.confidence),
        if entities.budget.mentioned { 50 } else { 0 },
        if entities.property_preferences.location.is_some() { 30 } else { 0 },
        if entities.property_preferences.beds.is_some() { 20 } else { 0 },
    ];

    let contributing: Vec<u32> = terms.into_iter().filter(|term| *term > 0).collect();
    if contributing.is_empty() {
        return 0;
    }
    let sum: u32 = contributing.iter().sum();
    (f64::from(sum) / contributing.len() as f64).round() as u8
}

/// True when at least one anchor attribute was extracted.
pub fn are_entities_sufficient(entities: &ExtractedEntities) -> bool {
    entities.motivation.level.is_some()
        || entities.timeframe.range.is_some()
        || entities.property_preferences.location.is_some()
        || entities.budget.mentioned
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use rapport_core::domain::contact::{MotivationLevel, Timeframe};

    use crate::llm::{CompletionRequest, InferenceClient};

    use super::{
        are_entities_sufficient, entity_confidence, BatchItem, EntityExtractor, BATCH_CHUNK_SIZE,
    };

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

    /// Fails only for texts containing the marker, to exercise per-item
    /// isolation inside a batch chunk.
    struct MarkerFailClient(&'static str);

    #[async_trait]
    impl InferenceClient for MarkerFailClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            if request.user_prompt.contains(self.0) {
                return Err(anyhow!("simulated failure"));
            }
            Ok(GOOD_RESPONSE.to_string())
        }
    }

    const GOOD_RESPONSE: &str = r#"```json
{
  "motivation": {"level": "high", "confidence": 85, "indicators": ["needs to relocate for work"]},
  "timeframe": {"range": "asap", "confidence": 140, "indicators": ["said right now"]},
  "property_preferences": {"location": "Maple Grove", "price_range": "$350k-$400k", "property_type": "single family", "beds": 3, "baths": 2.0, "must_haves": ["garage"]},
  "budget": {"range": "under $400k", "preapproved": true, "mentioned": true}
}
```"#;

    #[tokio::test]
    async fn extraction_normalizes_and_clamps_a_good_response() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("relocating, need a place", &StaticClient(GOOD_RESPONSE)).await;

        assert_eq!(entities.motivation.level, Some(MotivationLevel::High));
        assert_eq!(entities.motivation.confidence, 85);
        assert_eq!(entities.timeframe.range, Some(Timeframe::Immediate));
        // 140 on the wire clamps to 100.
        assert_eq!(entities.timeframe.confidence, 100);
        assert_eq!(entities.property_preferences.location.as_deref(), Some("Maple Grove"));
        assert_eq!(entities.property_preferences.beds, Some(3));
        assert!(entities.budget.preapproved);
        assert!(entities.budget.mentioned);
    }

    #[tokio::test]
    async fn collaborator_failure_degrades_to_full_defaults() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("any text", &FailingClient).await;
        assert_eq!(entities, Default::default());
        assert_eq!(entities.motivation.confidence, 0);
        assert_eq!(entities.timeframe.confidence, 0);
    }

    #[tokio::test]
    async fn malformed_response_degrades_identically_to_an_error() {
        let extractor = EntityExtractor::new();
        let garbled = extractor.extract("any text", &StaticClient("sorry, I cannot do that")).await;
        let failed = extractor.extract("any text", &FailingClient).await;
        assert_eq!(garbled, failed);
    }

    #[tokio::test]
    async fn batch_extraction_covers_every_item_across_chunks() {
        let extractor = EntityExtractor::new();
        let items: Vec<BatchItem> = (0..(BATCH_CHUNK_SIZE * 2 + 3))
            .map(|index| BatchItem {
                id: format!("contact-{index}"),
                text: format!("conversation {index}"),
            })
            .collect();

        let results = extractor.batch_extract(&items, &StaticClient(GOOD_RESPONSE)).await;
        assert_eq!(results.len(), items.len());
        assert!(results.values().all(|entities| entities.budget.mentioned));
    }

    #[tokio::test]
    async fn batch_failure_is_isolated_to_the_failing_item() {
        let extractor = EntityExtractor::new();
        let items = vec![
            BatchItem { id: "ok-1".to_string(), text: "fine".to_string() },
            BatchItem { id: "bad".to_string(), text: "POISON in here".to_string() },
            BatchItem { id: "ok-2".to_string(), text: "also fine".to_string() },
        ];

        let results = extractor.batch_extract(&items, &MarkerFailClient("POISON")).await;
        assert_eq!(results.len(), 3);
        assert!(results["ok-1"].budget.mentioned);
        assert!(results["ok-2"].budget.mentioned);
        assert_eq!(results["bad"], Default::default());
    }

    #[test]
    fn confidence_averages_only_contributing_terms() {
        let mut entities = super::ExtractedEntities::default();
        assert_eq!(entity_confidence(&entities), 0);

        entities.motivation.confidence = 80;
        assert_eq!(entity_confidence(&entities), 80);

        entities.budget.mentioned = true;
        // (80 + 50) / 2 = 65
        assert_eq!(entity_confidence(&entities), 65);

        entities.property_preferences.location = Some("Downtown".to_string());
        entities.property_preferences.beds = Some(2);
        // (80 + 50 + 30 + 20) / 4 = 45
        assert_eq!(entity_confidence(&entities), 45);
    }

    #[test]
    fn sufficiency_requires_any_anchor_attribute() {
        let mut entities = super::ExtractedEntities::default();
        assert!(!are_entities_sufficient(&entities));

        entities.budget.mentioned = true;
        assert!(are_entities_sufficient(&entities));

        entities.budget.mentioned = false;
        entities.timeframe.range = Some(Timeframe::ThreeToSixMonths);
        assert!(are_entities_sufficient(&entities));
    }
}
