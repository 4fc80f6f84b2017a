use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::AssociationStore;

/// Sparse joint-count table indexed in both directions.
///
/// Marginals are derived on demand by summing the row (source) or the
/// column (target) of the table. Only the grand total is cached.
///
/// # Invariants
/// - Every stored count is >= 1
/// - `by_source[s][t] == by_target[t][s]`
/// - `total` equals the sum of all stored counts
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct JointCounts {
	by_source: HashMap<String, BTreeMap<String, u64>>,
	by_target: HashMap<String, BTreeMap<String, u64>>,
	total: u64,
}

impl JointCounts {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `count` observations of the pair `(s, t)`.
	///
	/// A zero count is ignored so that the table never holds empty entries.
	pub fn add(&mut self, s: &str, t: &str, count: u64) {
		if count == 0 {
			return;
		}
		*self.by_source
			.entry(s.to_owned())
			.or_default()
			.entry(t.to_owned())
			.or_insert(0) += count;
		*self.by_target
			.entry(t.to_owned())
			.or_default()
			.entry(s.to_owned())
			.or_insert(0) += count;
		self.total += count;
	}

	/// Number of distinct `(s, t)` pairs.
	pub fn len(&self) -> usize {
		self.by_source.values().map(BTreeMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.total == 0
	}

	/// Iterates over every `(s, t, count)` triple.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
		self.by_source.iter().flat_map(|(s, row)| {
			row.iter().map(move |(t, count)| (s.as_str(), t.as_str(), *count))
		})
	}

	/// Builds the precomputed-marginal variant of this table.
	pub fn tabulate(self) -> MarginalTables {
		MarginalTables::from(self)
	}
}

fn non_zero(sum: u64) -> Option<u64> {
	(sum > 0).then_some(sum)
}

impl AssociationStore for JointCounts {
	fn joint_count(&self, s: &str, t: &str) -> Option<u64> {
		self.by_source.get(s)?.get(t).copied()
	}

	fn source_marginal(&self, s: &str) -> Option<u64> {
		non_zero(self.by_source.get(s)?.values().sum())
	}

	fn target_marginal(&self, t: &str) -> Option<u64> {
		non_zero(self.by_target.get(t)?.values().sum())
	}

	fn grand_total(&self) -> u64 {
		self.total
	}
}

/// Joint counts with precomputed per-token marginals.
///
/// Trades memory for O(1) marginal lookups. Answers are identical to the
/// ones of the underlying [`JointCounts`].
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MarginalTables {
	joint: JointCounts,
	source: HashMap<String, u64>,
	target: HashMap<String, u64>,
}

impl MarginalTables {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `count` observations of `(s, t)` and keeps marginals in sync.
	pub fn add(&mut self, s: &str, t: &str, count: u64) {
		if count == 0 {
			return;
		}
		self.joint.add(s, t, count);
		*self.source.entry(s.to_owned()).or_insert(0) += count;
		*self.target.entry(t.to_owned()).or_insert(0) += count;
	}

	/// Number of distinct `(s, t)` pairs.
	pub fn len(&self) -> usize {
		self.joint.len()
	}

	pub fn is_empty(&self) -> bool {
		self.joint.is_empty()
	}

	/// Read access to the joint-count table.
	pub fn joint(&self) -> &JointCounts {
		&self.joint
	}
}

impl From<JointCounts> for MarginalTables {
	fn from(joint: JointCounts) -> Self {
		let mut source: HashMap<String, u64> = HashMap::new();
		let mut target: HashMap<String, u64> = HashMap::new();
		for (s, t, count) in joint.iter() {
			*source.entry(s.to_owned()).or_insert(0) += count;
			*target.entry(t.to_owned()).or_insert(0) += count;
		}
		Self { joint, source, target }
	}
}

impl AssociationStore for MarginalTables {
	fn joint_count(&self, s: &str, t: &str) -> Option<u64> {
		self.joint.joint_count(s, t)
	}

	fn source_marginal(&self, s: &str) -> Option<u64> {
		self.source.get(s).copied()
	}

	fn target_marginal(&self, t: &str) -> Option<u64> {
		self.target.get(t).copied()
	}

	fn grand_total(&self) -> u64 {
		self.joint.grand_total()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> JointCounts {
		let mut joint = JointCounts::new();
		joint.add("rain", "umbrella", 4);
		joint.add("rain", "wet", 2);
		joint.add("sun", "wet", 1);
		joint.add("sun", "hat", 3);
		joint.add("rain", "umbrella", 1);
		joint
	}

	#[test]
	fn summed_marginals() {
		let joint = sample();
		assert_eq!(joint.joint_count("rain", "umbrella"), Some(5));
		assert_eq!(joint.source_marginal("rain"), Some(7));
		assert_eq!(joint.target_marginal("wet"), Some(3));
		assert_eq!(joint.grand_total(), 11);
		assert_eq!(joint.len(), 4);
	}

	#[test]
	fn unseen_keys_are_none() {
		let joint = sample();
		assert_eq!(joint.joint_count("rain", "hat"), None);
		assert_eq!(joint.source_marginal("snow"), None);
		assert_eq!(joint.target_marginal("rain"), None);
	}

	#[test]
	fn zero_counts_are_ignored() {
		let mut tables = MarginalTables::new();
		tables.add("a", "b", 0);
		assert!(tables.is_empty());
		assert_eq!(tables.source_marginal("a"), None);
	}

	#[test]
	fn tabulated_matches_summed() {
		let joint = sample();
		let tables = joint.clone().tabulate();

		let tokens = ["rain", "sun", "umbrella", "wet", "hat", "snow"];
		for s in tokens {
			assert_eq!(joint.source_marginal(s), tables.source_marginal(s), "source {s}");
			assert_eq!(joint.target_marginal(s), tables.target_marginal(s), "target {s}");
			for t in tokens {
				assert_eq!(joint.joint_count(s, t), tables.joint_count(s, t));
			}
		}
		assert_eq!(joint.grand_total(), tables.grand_total());
	}

	#[test]
	fn incremental_tables_match_tabulated() {
		let mut tables = MarginalTables::new();
		for (s, t, count) in sample().iter() {
			tables.add(s, t, count);
		}
		let tabulated = sample().tabulate();
		assert_eq!(tables.source_marginal("sun"), tabulated.source_marginal("sun"));
		assert_eq!(tables.target_marginal("umbrella"), tabulated.target_marginal("umbrella"));
		assert_eq!(tables.grand_total(), 11);
	}
}
