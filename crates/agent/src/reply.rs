use serde::Deserialize;
use tracing::warn;

use rapport_core::domain::analysis::{ReplyDraft, ReplyTone};
use rapport_core::domain::contact::AnalysisContext;
use rapport_core::domain::stage::PipelineStage;

use crate::llm::{extract_json_object, CompletionRequest, InferenceClient};

const REPLY_SYSTEM_PROMPT: &str = "You draft short, warm replies from a real-estate agent to a \
client. Respond with a single JSON object and nothing else. tone must be one of: Professional, \
Friendly, Urgent, Casual.";

fn build_reply_prompt(text: &str, context: &AnalysisContext) -> String {
    format!(
        "Contact first name: {name}\n\
        Relationship stage: {stage}\n\
        \n\
        Draft a reply to the conversation below in five sections.\n\
        Respond with JSON of exactly this shape:\n\
        {{\n\
        \x20 \"greeting\": \"\",\n\
        \x20 \"acknowledgment\": \"\",\n\
        \x20 \"value_proposition\": \"\",\n\
        \x20 \"next_step\": \"\",\n\
        \x20 \"closing\": \"\",\n\
        \x20 \"full_reply\": \"\",\n\
        \x20 \"tone\": \"Professional\",\n\
        \x20 \"edit_suggestions\": []\n\
        }}\n\
        \n\
        Conversation:\n{text}",
        name = context.first_name(),
        stage = context.current_stage,
    )
}

#[derive(Debug, Default, Deserialize)]
struct WireReply {
    #[serde(default)]
    greeting: String,
    #[serde(default)]
    acknowledgment: String,
    #[serde(default)]
    value_proposition: String,
    #[serde(default)]
    next_step: String,
    #[serde(default)]
    closing: String,
    #[serde(default)]
    full_reply: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    edit_suggestions: Vec<String>,
}

/// Output channel a draft is rendered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyChannel {
    Text,
    Email,
}

/// Full-tier stage: reply drafting. Collaborator failure yields a
/// stage-specific template addressed to the contact's first name.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplyDrafter;

impl ReplyDrafter {
    pub fn new() -> Self {
        Self
    }

    pub async fn generate_reply(
        &self,
        text: &str,
        context: &AnalysisContext,
        client: &dyn InferenceClient,
    ) -> ReplyDraft {
        let request =
            CompletionRequest::narrative(REPLY_SYSTEM_PROMPT, build_reply_prompt(text, context));
        match client.complete(&request).await {
            Ok(raw) => parse_reply(&raw).unwrap_or_else(|| {
                warn!(task = "reply_generation", "unparseable response; using template fallback");
                fallback_reply(context)
            }),
            Err(error) => {
                warn!(task = "reply_generation", %error, "inference failed; using template fallback");
                fallback_reply(context)
            }
        }
    }
}

fn parse_reply(raw: &str) -> Option<ReplyDraft> {
    let json = extract_json_object(raw)?;
    let wire: WireReply = serde_json::from_str(json).ok()?;

    let mut draft = ReplyDraft {
        greeting: wire.greeting,
        acknowledgment: wire.acknowledgment,
        value_proposition: wire.value_proposition,
        next_step: wire.next_step,
        closing: wire.closing,
        full_reply: wire.full_reply,
        tone: ReplyTone::parse_lenient(&wire.tone),
        edit_suggestions: wire.edit_suggestions,
    };
    if draft.full_reply.trim().is_empty() {
        draft.full_reply = compose_full_reply(&draft);
    }
    Some(draft)
}

fn compose_full_reply(draft: &ReplyDraft) -> String {
    [
        draft.greeting.as_str(),
        draft.acknowledgment.as_str(),
        draft.value_proposition.as_str(),
        draft.next_step.as_str(),
        draft.closing.as_str(),
    ]
    .iter()
    .filter(|section| !section.trim().is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join("\n\n")
}

fn fallback_reply(context: &AnalysisContext) -> ReplyDraft {
    let name = context.first_name();
    let mut draft = match context.current_stage {
        PipelineStage::Lead => ReplyDraft {
            greeting: format!("Hi {name},"),
            acknowledgment: "Thanks for reaching out about your home search.".to_string(),
            value_proposition:
                "I work with buyers at every step, from first look to closing day.".to_string(),
            next_step: "Would a quick call this week work to talk through what you are looking for?"
                .to_string(),
            closing: "Talk soon!".to_string(),
            tone: ReplyTone::Friendly,
            ..Default::default()
        },
        PipelineStage::ActiveOpportunity => ReplyDraft {
            greeting: format!("Hi {name},"),
            acknowledgment: "Great talking with you as the search heats up.".to_string(),
            value_proposition:
                "I am watching new listings daily so nothing slips past us.".to_string(),
            next_step: "Let me know which homes you want to see and I will set up the showings."
                .to_string(),
            closing: "Speak soon,".to_string(),
            tone: ReplyTone::Professional,
            ..Default::default()
        },
        _ => ReplyDraft {
            greeting: format!("Hi {name},"),
            acknowledgment: "Thanks for the update.".to_string(),
            value_proposition: "I am here whenever questions come up.".to_string(),
            next_step: "I will follow up with next steps shortly.".to_string(),
            closing: "Best,".to_string(),
            tone: ReplyTone::Professional,
            ..Default::default()
        },
    };
    draft.full_reply = compose_full_reply(&draft);
    draft.edit_suggestions = vec!["Template reply; personalize before sending".to_string()];
    draft
}

/// Renders a draft for a delivery channel. Text messages collapse the
/// greeting, acknowledgment, and next step into one line; email keeps all
/// five sections with paragraph breaks.
pub fn format_reply_for_channel(draft: &ReplyDraft, channel: ReplyChannel) -> String {
    match channel {
        ReplyChannel::Text => {
            let combined = format!(
                "{} {} {}",
                draft.greeting, draft.acknowledgment, draft.next_step
            );
            combined.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        ReplyChannel::Email => compose_full_reply(draft),
    }
}
