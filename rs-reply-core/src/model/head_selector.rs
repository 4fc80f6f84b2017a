use std::collections::HashSet;

use log::debug;

use super::pmi::PmiScorer;
use crate::store::HeadRelationStore;

/// Picks plausible reply-opening tokens for a set of input features.
///
/// A head is a candidate if it opened a reply to an input containing at
/// least one of the features. Candidates are ranked by their summed PMI
/// with all features.
#[derive(Clone, Copy)]
pub struct HeadSelector<'a> {
	relations: &'a dyn HeadRelationStore,
	scorer: PmiScorer<'a>,
}

impl<'a> HeadSelector<'a> {
	pub fn new(relations: &'a dyn HeadRelationStore, scorer: PmiScorer<'a>) -> Self {
		Self { relations, scorer }
	}

	/// Returns at most `limit` `(head, score)` pairs, best first.
	///
	/// # Returns
	/// - An empty vector when no feature has a recorded head. This is an
	///   expected outcome, not an error.
	///
	/// # Notes
	/// - Equal scores keep the first-seen order of the candidates
	///   (features in input order, heads in store order).
	/// - Duplicate features are counted once.
	pub fn select<S: AsRef<str>>(&self, features: &[S], limit: usize) -> Vec<(String, f64)> {
		let mut unique = HashSet::new();
		let features: Vec<&str> = features
			.iter()
			.map(|feature| feature.as_ref())
			.filter(|feature| unique.insert(*feature))
			.collect();

		let mut seen = HashSet::new();
		let mut candidates: Vec<String> = Vec::new();
		for feature in &features {
			for (head, _) in self.relations.heads_for(feature) {
				if seen.insert(head.clone()) {
					candidates.push(head);
				}
			}
		}

		if candidates.is_empty() {
			debug!("no head relation for features {features:?}");
			return Vec::new();
		}

		let mut scored: Vec<(String, f64)> = candidates
			.into_iter()
			.map(|head| {
				let score = self.scorer.relevance(&features, &head);
				(head, score)
			})
			.collect();

		// Stable sort keeps first-seen order among ties.
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.truncate(limit);
		scored
	}
}
