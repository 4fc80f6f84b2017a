use crate::store::TrigramStore;

/// Maximum-likelihood trigram language model.
///
/// Wraps a [`TrigramStore`] and exposes the two queries the generator
/// needs: candidate retrieval and conditional probability. No smoothing
/// is applied, an unseen continuation has probability 0.
#[derive(Clone, Copy)]
pub struct LanguageModel<'a> {
	store: &'a dyn TrigramStore,
}

/// Every continuation of a context together with its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
	/// `(w3, P(w3 | w1, w2))`, in store order.
	pub entries: Vec<(String, f64)>,
}

impl Distribution {
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<'a> LanguageModel<'a> {
	pub fn new(store: &'a dyn TrigramStore) -> Self {
		Self { store }
	}

	/// All distinct tokens ever observed after `(w1, w2)`.
	pub fn candidates(&self, w1: &str, w2: &str) -> Vec<String> {
		self.store
			.continuations(w1, w2)
			.into_iter()
			.map(|(w3, _)| w3)
			.collect()
	}

	/// `count(w1, w2, w3) / sum over w3' of count(w1, w2, w3')`.
	///
	/// Returns 0 if the context or the continuation is unknown.
	pub fn probability(&self, w1: &str, w2: &str, w3: &str) -> f64 {
		let continuations = self.store.continuations(w1, w2);
		let total: u64 = continuations.iter().map(|(_, count)| count).sum();
		if total == 0 {
			return 0.0;
		}
		continuations
			.iter()
			.find(|(token, _)| token == w3)
			.map_or(0.0, |(_, count)| *count as f64 / total as f64)
	}

	/// Candidates and their probabilities from a single store lookup.
	///
	/// Equivalent to calling [`probability`](Self::probability) for each
	/// entry of [`candidates`](Self::candidates).
	pub fn distribution(&self, w1: &str, w2: &str) -> Distribution {
		let continuations = self.store.continuations(w1, w2);
		let total: u64 = continuations.iter().map(|(_, count)| count).sum();
		if total == 0 {
			return Distribution { entries: Vec::new() };
		}
		Distribution {
			entries: continuations
				.into_iter()
				.map(|(w3, count)| (w3, count as f64 / total as f64))
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::TrigramTable;
	use proptest::prelude::*;

	fn table() -> TrigramTable {
		let mut table = TrigramTable::new();
		table.add("I", "like", "tea", 3);
		table.add("I", "like", "coffee", 1);
		table.add("like", "tea", "<EOS>", 2);
		table
	}

	#[test]
	fn candidates_of_known_context() {
		let table = table();
		let lm = LanguageModel::new(&table);
		assert_eq!(lm.candidates("I", "like"), vec!["coffee".to_owned(), "tea".to_owned()]);
		assert!(lm.candidates("like", "coffee").is_empty());
	}

	#[test]
	fn probability_is_relative_frequency() {
		let table = table();
		let lm = LanguageModel::new(&table);
		assert_eq!(lm.probability("I", "like", "tea"), 0.75);
		assert_eq!(lm.probability("I", "like", "coffee"), 0.25);
		assert_eq!(lm.probability("I", "like", "water"), 0.0);
		assert_eq!(lm.probability("you", "like", "tea"), 0.0);
	}

	#[test]
	fn distribution_agrees_with_probability() {
		let table = table();
		let lm = LanguageModel::new(&table);
		for (w3, p) in lm.distribution("I", "like").entries {
			assert_eq!(p, lm.probability("I", "like", &w3));
		}
		assert!(lm.distribution("nothing", "here").is_empty());
	}

	proptest! {
		#[test]
		fn probabilities_sum_to_one(counts in proptest::collection::vec(1u64..1000, 1..30)) {
			let mut table = TrigramTable::new();
			for (i, count) in counts.iter().enumerate() {
				table.add("a", "b", &format!("w{i}"), *count);
			}
			let lm = LanguageModel::new(&table);
			let sum: f64 = lm
				.candidates("a", "b")
				.iter()
				.map(|w3| lm.probability("a", "b", w3))
				.sum();
			prop_assert!((sum - 1.0).abs() < 1e-9);
		}
	}
}
