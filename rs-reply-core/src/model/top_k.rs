use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Fixed-capacity accumulator keeping the `k` best-scored items seen so far.
///
/// Backed by a min-heap of size `k`: each push costs O(log k) and the
/// smallest kept item is evicted when a better one arrives.
///
/// The result is identical to sorting every pushed item by descending
/// score (stable sort) and truncating to `k`. Equal scores therefore keep
/// their push order.
#[derive(Debug)]
pub struct TopK<T> {
	capacity: usize,
	heap: BinaryHeap<Reverse<Ranked<T>>>,
	pushed: u64,
}

#[derive(Debug)]
struct Ranked<T> {
	score: f64,
	order: u64,
	item: T,
}

impl<T> PartialEq for Ranked<T> {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T> Ord for Ranked<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		// Earlier pushes rank higher among equal scores.
		self.score
			.total_cmp(&other.score)
			.then_with(|| other.order.cmp(&self.order))
	}
}

impl<T> TopK<T> {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			heap: BinaryHeap::with_capacity(capacity + 1),
			pushed: 0,
		}
	}

	/// Offers `item` with `score`.
	pub fn push(&mut self, item: T, score: f64) {
		if self.capacity == 0 {
			return;
		}
		let ranked = Ranked { score, order: self.pushed, item };
		self.pushed += 1;

		if self.heap.len() < self.capacity {
			self.heap.push(Reverse(ranked));
			return;
		}
		if let Some(mut weakest) = self.heap.peek_mut() {
			if ranked > weakest.0 {
				*weakest = Reverse(ranked);
			}
		}
	}

	pub fn len(&self) -> usize {
		self.heap.len()
	}

	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}

	/// Kept items, best first.
	pub fn into_sorted_vec(self) -> Vec<(T, f64)> {
		// Ascending order of `Reverse` is descending order of scores.
		self.heap
			.into_sorted_vec()
			.into_iter()
			.map(|Reverse(ranked)| (ranked.item, ranked.score))
			.collect()
	}
}
