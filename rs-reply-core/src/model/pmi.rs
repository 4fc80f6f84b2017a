use log::debug;

use crate::store::AssociationStore;

/// Smoothed positive pointwise mutual information between two tokens.
///
/// For a pair `(s, t)` with joint count `n_st`, marginals `n_s` / `n_t`
/// and grand total `N`:
///
/// ```text
/// raw   = ln(n_st) - ln(n_s) - ln(n_t) + ln(N)
/// damp  = n_st / (n_st + 1) * min(n_s, n_t) / (min(n_s, n_t) + 1)
/// score = max(0, raw * damp)
/// ```
///
/// The damping factor tempers the well-known bias of PMI toward rare
/// events: it approaches 1 as counts grow and is at most 0.5 for a pair
/// seen once.
#[derive(Clone, Copy)]
pub struct PmiScorer<'a> {
	store: &'a dyn AssociationStore,
}

impl<'a> PmiScorer<'a> {
	pub fn new(store: &'a dyn AssociationStore) -> Self {
		Self { store }
	}

	/// Scores the association of `s` (input side) with `t` (reply side).
	///
	/// Never fails. Returns 0 when either token or the pair is unseen, and
	/// when the association is negative.
	pub fn score(&self, s: &str, t: &str) -> f64 {
		let num_s = self.store.source_marginal(s).unwrap_or(0);
		let num_t = self.store.target_marginal(t).unwrap_or(0);
		let num_st = self.store.joint_count(s, t).unwrap_or(0);

		if num_s == 0 || num_t == 0 || num_st == 0 {
			debug!("unseen pair: n({s})={num_s} n({t})={num_t} n({s},{t})={num_st}");
			return 0.0;
		}

		let total = self.store.grand_total() as f64;
		let (num_s, num_t, num_st) = (num_s as f64, num_t as f64, num_st as f64);

		let raw = num_st.ln() - num_s.ln() - num_t.ln() + total.ln();
		let min_marginal = num_s.min(num_t);
		let damp = (num_st / (num_st + 1.0)) * (min_marginal / (min_marginal + 1.0));

		(raw * damp).max(0.0)
	}

	/// Sum of `score(feature, t)` over all `features`.
	pub fn relevance<S: AsRef<str>>(&self, features: &[S], t: &str) -> f64 {
		features.iter().map(|feature| self.score(feature.as_ref(), t)).sum()
	}
}
