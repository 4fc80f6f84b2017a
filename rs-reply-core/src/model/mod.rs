//! Scoring and generation layers of the reply engine.
//!
//! - PMI association scoring (`PmiScorer`)
//! - Trigram candidate model (`LanguageModel`)
//! - Bounded top-k selection (`TopK`)
//! - Reply-opening token selection (`HeadSelector`)
//! - The token-by-token walk (`GenerationEngine`)
//! - Per-request orchestration (`ReplyOrchestrator`)
//! - Settings (`ReplyConfig`)

/// Smoothed positive PMI over the association store.
pub mod pmi;

/// Maximum-likelihood trigram model.
pub mod language_model;

/// Fixed-capacity top-k accumulator.
pub mod top_k;

/// Head (reply-opening token) selection.
pub mod head_selector;

/// Generation loop, steps and termination states.
pub mod engine;

/// Heads, trials and text rendering for one request.
pub mod orchestrator;

/// Reply configuration, modes and strategies.
pub mod config;
