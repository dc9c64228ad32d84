use anyhow::Result;
use async_trait::async_trait;

/// One prompt for the inference collaborator. Temperature defaults are
/// per-shape: structured calls run cold, narrative calls run warmer.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub expect_structured_output: bool,
}

impl CompletionRequest {
    pub fn structured(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.2,
            expect_structured_output: true,
        }
    }

    pub fn narrative(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.7,
            expect_structured_output: false,
        }
    }
}

/// Pluggable seam to the inference service. The core never talks to the
/// network itself; callers supply an implementation (HTTP, local model,
/// test double). An `Err` here and a malformed `Ok` are treated identically
/// by every stage: degrade to the stage default, never propagate.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Locates the outermost JSON object in a completion. Models wrap payloads
/// in code fences or prose often enough that parsing the raw string directly
/// is not viable.
pub(crate) fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

pub(crate) fn clamp_confidence(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}
