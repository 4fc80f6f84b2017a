use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::ReplyConfig;
use super::engine::{Generation, GenerationEngine, GenerationParams, Termination};
use super::head_selector::HeadSelector;
use super::language_model::LanguageModel;
use super::pmi::PmiScorer;
use crate::analyzer::{Analyzer, extract_features};
use crate::error::ReplyError;
use crate::store::{AssociationStore, CountStore, HeadRelationStore, TrigramStore};

/// A generated reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
	/// Opening token chosen by the head selector.
	pub head: String,
	/// Head selector score.
	pub score: f64,
	/// Continuation generated after the head.
	pub tokens: Vec<String>,
	/// Head and continuation joined with the configured separator.
	pub text: String,
	pub termination: Termination,
}

/// High-level reply generator.
///
/// # Responsibilities
/// - Select heads for the input features
/// - Run one generation (or several trials) per head
/// - Keep the shortest trial and render it as text
///
/// Heads and trials are independent: each gets its own RNG, derived from
/// the caller's RNG before any work starts, so the result for a given seed
/// does not depend on `parallel`.
pub struct ReplyOrchestrator<'a> {
	selector: HeadSelector<'a>,
	engine: GenerationEngine<'a>,
	config: ReplyConfig,
}

impl<'a> ReplyOrchestrator<'a> {
	/// Wires the components over the given stores.
	///
	/// # Errors
	/// Returns `ReplyError::Config` if `config` is invalid.
	pub fn new(
		associations: &'a dyn AssociationStore,
		trigrams: &'a dyn TrigramStore,
		head_relations: &'a dyn HeadRelationStore,
		config: ReplyConfig,
	) -> Result<Self, ReplyError> {
		config.validate()?;
		let scorer = PmiScorer::new(associations);
		Ok(Self {
			selector: HeadSelector::new(head_relations, scorer),
			engine: GenerationEngine::new(LanguageModel::new(trigrams), scorer, &config),
			config,
		})
	}

	/// Same as [`new`](Self::new) over the tables of a [`CountStore`].
	pub fn from_store(store: &'a CountStore, config: ReplyConfig) -> Result<Self, ReplyError> {
		Self::new(store.associations(), store.trigrams(), store.head_relations(), config)
	}

	pub fn config(&self) -> &ReplyConfig {
		&self.config
	}

	/// Ranked heads for `features`, at most `limit`.
	pub fn heads<S: AsRef<str>>(&self, features: &[S], limit: usize) -> Vec<(String, f64)> {
		self.selector.select(features, limit)
	}

	/// Features of `sentence` according to `analyzer` and the configured
	/// part-of-speech filter.
	pub fn features(&self, analyzer: &dyn Analyzer, sentence: &str) -> Vec<String> {
		extract_features(&analyzer.parse(sentence), &self.config.content_pos)
	}

	/// Parses `sentence` and replies to its features.
	pub fn reply<R: Rng>(&self, analyzer: &dyn Analyzer, sentence: &str, rng: &mut R) -> Vec<Reply> {
		let features = self.features(analyzer, sentence);
		info!("features: {features:?}");
		self.reply_to_features(&features, rng)
	}

	/// One reply per selected head (at most `num_heads`), best head first.
	///
	/// Returns an empty vector when no head is found.
	pub fn reply_to_features<S, R>(&self, features: &[S], rng: &mut R) -> Vec<Reply>
	where
		S: AsRef<str> + Sync,
		R: Rng,
	{
		let heads = self.selector.select(features, self.config.num_heads);
		info!("heads: {heads:?}");
		if heads.is_empty() {
			return Vec::new();
		}

		let params = GenerationParams {
			mode: self.config.mode,
			maxlen: self.config.maxlen,
			first_sample_width: self.config.first_sample_width(),
			deadline: self.config.deadline().map(|budget| Instant::now() + budget),
		};

		let trials = self.config.strategy.trials();
		let jobs: Vec<(usize, u64)> = (0..heads.len())
			.flat_map(|head| (0..trials).map(move |_| head))
			.map(|head| (head, rng.random::<u64>()))
			.collect();

		let generations = self.run_jobs(&heads, &jobs, features, &params);

		heads
			.into_iter()
			.zip(generations.chunks(trials))
			.filter_map(|((head, score), candidates)| {
				for candidate in candidates {
					debug!(
						"trial for {head} ({:?}): {}",
						candidate.termination,
						self.text(&head, &candidate.tokens)
					);
				}
				// First shortest trial wins.
				let best = candidates.iter().min_by_key(|generation| generation.tokens.len())?;
				Some(self.render(head, score, best.clone()))
			})
			.collect()
	}

	/// Runs every `(head index, seed)` job, returning generations in job order.
	fn run_jobs<S: AsRef<str> + Sync>(
		&self,
		heads: &[(String, f64)],
		jobs: &[(usize, u64)],
		features: &[S],
		params: &GenerationParams,
	) -> Vec<Generation> {
		let run = |&(head, seed): &(usize, u64)| {
			let mut rng = StdRng::seed_from_u64(seed);
			self.engine.generate(Some(heads[head].0.as_str()), features, params, &mut rng)
		};

		let workers = num_cpus::get().min(jobs.len());
		if !self.config.parallel || workers <= 1 {
			return jobs.iter().map(run).collect();
		}

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for worker in 0..workers {
				let tx = tx.clone();
				let run = &run;
				scope.spawn(move || {
					for index in (worker..jobs.len()).step_by(workers) {
						// The receiver outlives the scope, sending cannot fail.
						let _ = tx.send((index, run(&jobs[index])));
					}
				});
			}
		});
		drop(tx);

		let mut done: Vec<(usize, Generation)> = rx.iter().collect();
		done.sort_by_key(|(index, _)| *index);
		done.into_iter().map(|(_, generation)| generation).collect()
	}

	/// `head` and `tokens` joined with the configured separator.
	fn text(&self, head: &str, tokens: &[String]) -> String {
		let mut parts: Vec<&str> = Vec::with_capacity(tokens.len() + 1);
		parts.push(head);
		parts.extend(tokens.iter().map(String::as_str));
		parts.join(self.config.separator.as_str())
	}

	fn render(&self, head: String, score: f64, generation: Generation) -> Reply {
		let text = self.text(&head, &generation.tokens);
		Reply {
			head,
			score,
			tokens: generation.tokens,
			text,
			termination: generation.termination,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::config::{Mode, Strategy};

	fn store() -> CountStore {
		let mut store = CountStore::new();
		store.add_head_relation("tea", "I", 3);
		store.add_head_relation("tea", "Green", 1);
		store.add_association("tea", "Green", 4);
		store.add_association("tea", "I", 1);
		store.add_association("coffee", "I", 6);
		store.add_association("tea", "tea", 5);
		store.add_association("coffee", "black", 9);

		store.add_trigram("<BOS0>", "I", "like", 2);
		store.add_trigram("I", "like", "tea", 1);
		store.add_trigram("I", "like", "coffee", 3);
		store.add_trigram("like", "tea", "<EOS>", 1);
		store.add_trigram("like", "coffee", "very", 1);
		store.add_trigram("coffee", "very", "much", 1);
		store.add_trigram("very", "much", "<EOS>", 1);
		store.add_trigram("<BOS0>", "Green", "tea", 1);
		store.add_trigram("Green", "tea", "<EOS>", 1);
		store
	}

	fn config() -> ReplyConfig {
		let mut config = ReplyConfig::default();
		config.separator = " ".to_owned();
		config.mode = Mode::Both;
		config
	}

	#[test]
	fn one_reply_per_head() {
		let store = store();
		let orchestrator = ReplyOrchestrator::from_store(&store, config()).unwrap();
		let replies = orchestrator.reply_to_features(&["tea"], &mut StdRng::seed_from_u64(5));

		assert_eq!(replies.len(), 2);
		assert_eq!(replies[0].head, "Green");
		assert_eq!(replies[0].text, "Green tea");
		assert_eq!(replies[0].termination, Termination::End);
		// "tea" is relevant to the input, so the walk picks it over "coffee".
		assert_eq!(replies[1].text, "I like tea");
	}

	#[test]
	fn no_heads_no_replies() {
		let store = store();
		let orchestrator = ReplyOrchestrator::from_store(&store, config()).unwrap();
		assert!(orchestrator.reply_to_features(&["juice"], &mut StdRng::seed_from_u64(0)).is_empty());
	}

	#[test]
	fn num_heads_bounds_replies() {
		let store = store();
		let mut config = config();
		config.set_num_heads(1).unwrap();
		let orchestrator = ReplyOrchestrator::from_store(&store, config).unwrap();
		assert_eq!(orchestrator.reply_to_features(&["tea"], &mut StdRng::seed_from_u64(0)).len(), 1);
	}

	#[test]
	fn invalid_config_is_rejected() {
		let store = store();
		let mut config = config();
		config.end_symbol = "<BOS0>".to_owned();
		assert!(matches!(
			ReplyOrchestrator::from_store(&store, config),
			Err(ReplyError::Config(_))
		));
	}

	#[test]
	fn parallel_and_sequential_agree() {
		let store = store();
		let mut sequential = config();
		sequential.parallel = false;
		sequential.set_first_sample_width(3).unwrap();
		sequential.set_strategy(Strategy::ShortestOf { trials: 4 }).unwrap();
		let mut parallel = sequential.clone();
		parallel.parallel = true;

		let a = ReplyOrchestrator::from_store(&store, sequential).unwrap();
		let b = ReplyOrchestrator::from_store(&store, parallel).unwrap();
		for seed in 0..10 {
			assert_eq!(
				a.reply_to_features(&["tea"], &mut StdRng::seed_from_u64(seed)),
				b.reply_to_features(&["tea"], &mut StdRng::seed_from_u64(seed))
			);
		}
	}

	#[test]
	fn shortest_trial_wins() {
		let mut store = CountStore::new();
		store.add_head_relation("x", "go", 1);
		store.add_trigram("<BOS0>", "go", "a", 1);
		store.add_trigram("<BOS0>", "go", "b", 1);
		store.add_trigram("go", "a", "<EOS>", 1);
		store.add_trigram("go", "b", "c", 1);
		store.add_trigram("b", "c", "<EOS>", 1);

		let mut config = config();
		config.parallel = false;
		config.set_first_sample_width(2).unwrap();
		config.set_strategy(Strategy::ShortestOf { trials: 32 }).unwrap();
		let orchestrator = ReplyOrchestrator::from_store(&store, config).unwrap();

		let replies = orchestrator.reply_to_features(&["x"], &mut StdRng::seed_from_u64(9));
		assert_eq!(replies.len(), 1);
		assert_eq!(replies[0].tokens, vec!["a".to_owned()]);
	}

	#[test]
	fn trial_text_uses_the_separator() {
		let store = store();
		let mut config = config();
		config.separator = "_".to_owned();
		let orchestrator = ReplyOrchestrator::from_store(&store, config).unwrap();
		let tokens = vec!["like".to_owned(), "tea".to_owned()];
		assert_eq!(orchestrator.text("I", &tokens), "I_like_tea");
		assert_eq!(orchestrator.text("I", &[]), "I");
	}

	#[test]
	fn first_sample_width_diversifies_openings() {
		let mut store = CountStore::new();
		store.add_head_relation("x", "go", 1);
		for token in ["b", "c", "d", "e"] {
			store.add_trigram("<BOS0>", "go", token, 1);
			store.add_trigram("go", token, "<EOS>", 1);
		}

		let openings = |width: usize| {
			let mut config = config();
			config.parallel = false;
			config.set_strategy(Strategy::Single).unwrap();
			config.set_first_sample_width(width).unwrap();
			let orchestrator = ReplyOrchestrator::from_store(&store, config).unwrap();
			(0..200)
				.map(|seed| orchestrator.reply_to_features(&["x"], &mut StdRng::seed_from_u64(seed))[0].text.clone())
				.collect::<std::collections::BTreeSet<_>>()
		};

		assert_eq!(openings(1).len(), 1);
		assert_eq!(openings(4).len(), 4);
	}

	#[test]
	fn deadline_stops_a_cyclic_walk() {
		let mut store = CountStore::new();
		store.add_head_relation("la", "la", 1);
		store.add_association("la", "la", 3);
		store.add_trigram("<BOS0>", "la", "la", 1);
		store.add_trigram("la", "la", "la", 1);

		let mut config = config();
		config.maxlen_cap = usize::MAX;
		config.set_maxlen(usize::MAX).unwrap();
		config.set_strategy(Strategy::Single).unwrap();
		config.deadline_ms = Some(20);
		let orchestrator = ReplyOrchestrator::from_store(&store, config).unwrap();

		let replies = orchestrator.reply_to_features(&["la"], &mut StdRng::seed_from_u64(0));
		assert_eq!(replies.len(), 1);
		assert_eq!(replies[0].termination, Termination::Deadline);
	}
}
