//! Analysis Runtime - LLM-backed conversation intelligence
//!
//! This crate provides the inference-facing half of rapport:
//! - Extracts structured attributes from conversational text (mini tier)
//! - Classifies the relationship stage and suggests governed transitions
//! - Recommends the next action and drafts replies (full tier)
//! - Orchestrates the stages behind the cost-tier router and tracks usage
//!
//! # Architecture
//!
//! One analysis is a short sequential chain:
//! 1. **Routing** (`rapport-core::routing`) - decide the tier per task
//! 2. **Pattern detection** (`rapport-core::signals`) - free, rule-based
//! 3. **Extraction / classification / generation** (this crate) - one
//!    inference call per stage through the `InferenceClient` seam
//! 4. **Aggregation** (`orchestrator`) - merge partial results, compute
//!    overall confidence, record usage
//!
//! # Degradation Principle
//!
//! The inference collaborator is allowed to fail; the analysis is not. Every
//! stage absorbs collaborator errors and malformed responses identically and
//! falls back to its typed default (or a deterministic rule path), so
//! `analyze` always returns a fully-populated result.

pub mod actions;
pub mod extraction;
pub mod llm;
pub mod orchestrator;
pub mod reply;
pub mod stages;

pub use actions::ActionRecommender;
pub use extraction::{
    are_entities_sufficient, entity_confidence, BatchItem, EntityExtractor, BATCH_CHUNK_SIZE,
};
pub use llm::{CompletionRequest, InferenceClient};
pub use orchestrator::AnalysisRuntime;
pub use reply::{format_reply_for_channel, ReplyChannel, ReplyDrafter};
pub use stages::StageDetector;
