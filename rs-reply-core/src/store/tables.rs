use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{HeadRelationStore, TrigramStore};

/// Trigram counts indexed by their two-token context.
///
/// Conceptually a Markov chain of order 2: each context `(w1, w2)` is a
/// state whose outgoing edges are the observed `w3` weighted by count.
///
/// # Invariants
/// - Each stored count is >= 1
/// - Continuations are kept sorted by token
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TrigramTable {
	contexts: HashMap<(String, String), BTreeMap<String, u64>>,
}

impl TrigramTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `count` occurrences of `w3` following `(w1, w2)`.
	pub fn add(&mut self, w1: &str, w2: &str, w3: &str, count: u64) {
		if count == 0 {
			return;
		}
		*self.contexts
			.entry((w1.to_owned(), w2.to_owned()))
			.or_default()
			.entry(w3.to_owned())
			.or_insert(0) += count;
	}

	/// Number of distinct contexts.
	pub fn len(&self) -> usize {
		self.contexts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.contexts.is_empty()
	}
}

impl TrigramStore for TrigramTable {
	fn continuations(&self, w1: &str, w2: &str) -> Vec<(String, u64)> {
		// Tuple keys cannot be borrowed as (&str, &str), hence the owned lookup key.
		self.contexts
			.get(&(w1.to_owned(), w2.to_owned()))
			.map(|next| next.iter().map(|(w3, count)| (w3.clone(), *count)).collect())
			.unwrap_or_default()
	}
}

/// Feature token -> tokens that began a reply, with counts.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HeadRelationTable {
	heads: HashMap<String, BTreeMap<String, u64>>,
}

impl HeadRelationTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, feature: &str, head: &str, count: u64) {
		if count == 0 {
			return;
		}
		*self.heads
			.entry(feature.to_owned())
			.or_default()
			.entry(head.to_owned())
			.or_insert(0) += count;
	}

	/// Number of features with at least one recorded head.
	pub fn len(&self) -> usize {
		self.heads.len()
	}

	pub fn is_empty(&self) -> bool {
		self.heads.is_empty()
	}
}

impl HeadRelationStore for HeadRelationTable {
	fn heads_for(&self, feature: &str) -> Vec<(String, u64)> {
		self.heads
			.get(feature)
			.map(|heads| heads.iter().map(|(head, count)| (head.clone(), *count)).collect())
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn continuations_are_sorted_and_summed() {
		let mut table = TrigramTable::new();
		table.add("a", "b", "z", 1);
		table.add("a", "b", "c", 2);
		table.add("a", "b", "z", 3);

		assert_eq!(
			table.continuations("a", "b"),
			vec![("c".to_owned(), 2), ("z".to_owned(), 4)]
		);
		assert!(table.continuations("b", "a").is_empty());
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn heads_for_unknown_feature_is_empty() {
		let mut table = HeadRelationTable::new();
		table.add("coffee", "I", 2);
		table.add("coffee", "Tea", 0);

		assert_eq!(table.heads_for("coffee"), vec![("I".to_owned(), 2)]);
		assert!(table.heads_for("tea").is_empty());
	}
}
