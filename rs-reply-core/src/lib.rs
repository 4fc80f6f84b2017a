//! Reply generation from a trigram language model steered by PMI.
//!
//! This crate turns an input utterance into a handful of plausible reply
//! sentences:
//! - Input features are extracted by an external analyzer
//! - Reply-opening tokens (heads) are ranked by association with the features
//! - Each head seeds a trigram walk that blends likelihood and relevance
//!
//! All count tables are read-only at generation time.

/// Count stores (associations, trigrams, head relations) and their loader.
pub mod store;

/// Scoring, generation and orchestration.
pub mod model;

/// Analyzer seam and feature extraction.
pub mod analyzer;

/// Error type.
pub mod error;

/// I/O utilities (data directory, dump reading).
///
/// Not exposed
pub(crate) mod io;

pub use analyzer::{Analyzer, TaggedTextAnalyzer, Token, extract_features};
pub use error::ReplyError;
pub use model::config::{Mode, ReplyConfig, Strategy};
pub use model::engine::{Generation, GenerationEngine, GenerationParams, Step, Termination};
pub use model::orchestrator::{Reply, ReplyOrchestrator};
pub use store::CountStore;
