//! Read-only count stores consumed by the scoring and generation layers.
//!
//! The tables are produced offline; at generation time the engine only
//! issues lookups through the traits below. Every trait is `Send + Sync`
//! so that one store can serve several generation workers at once.

/// Association adapters (joint counts, marginals, grand total).
pub mod association;

/// Trigram and head-relation tables.
pub mod tables;

/// Bundle of all tables plus the data-directory loader.
pub mod count_store;

pub use association::{JointCounts, MarginalTables};
pub use count_store::CountStore;
pub use tables::{HeadRelationTable, TrigramTable};

/// Co-occurrence counts between an input-side token and a reply-side token.
///
/// `None` means the key was never observed. Implementations never return
/// `Some(0)`.
pub trait AssociationStore: Send + Sync {
	/// Number of times `(s, t)` was observed together.
	fn joint_count(&self, s: &str, t: &str) -> Option<u64>;

	/// Sum of all joint counts having `s` as source.
	fn source_marginal(&self, s: &str) -> Option<u64>;

	/// Sum of all joint counts having `t` as target.
	fn target_marginal(&self, t: &str) -> Option<u64>;

	/// Sum of every joint count in the store.
	fn grand_total(&self) -> u64;
}

/// Trigram continuation counts.
pub trait TrigramStore: Send + Sync {
	/// All `(w3, count)` observed after the context `(w1, w2)`.
	///
	/// The order is stable for a given store (sorted by token), which keeps
	/// seeded generation reproducible.
	fn continuations(&self, w1: &str, w2: &str) -> Vec<(String, u64)>;
}

/// Tokens that opened a reply to an input containing a given feature.
pub trait HeadRelationStore: Send + Sync {
	/// All `(head, count)` recorded for `feature`, sorted by head.
	fn heads_for(&self, feature: &str) -> Vec<(String, u64)>;
}
