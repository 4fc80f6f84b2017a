use std::time::Instant;

use log::{debug, warn};
use rand::Rng;

use super::config::{Mode, ReplyConfig};
use super::language_model::LanguageModel;
use super::pmi::PmiScorer;
use super::top_k::TopK;

/// Number of candidates kept in each ranking.
pub const RANKING_SIZE: usize = 5;

/// Outcome of a single generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
	/// A regular token was chosen.
	Continue(String),
	/// The end sentinel was chosen.
	Done,
	/// The context has no observed continuation.
	DeadEnd,
}

/// Why a generation stopped. All variants are graceful stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	End,
	MaxLength,
	DeadEnd,
	Deadline,
}

/// Generated continuation (seed tokens excluded, end sentinel excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
	pub tokens: Vec<String>,
	pub termination: Termination,
}

/// Per-call generation settings.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
	/// Ranking used from the second step on.
	pub mode: Mode,
	/// Maximum number of generated tokens.
	pub maxlen: usize,
	/// Sampling width of the first step.
	pub first_sample_width: usize,
	/// Generation stops before a step started after this instant.
	pub deadline: Option<Instant>,
}

/// The three top-`RANKING_SIZE` rankings of one context's candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Rankings {
	/// By language-model probability.
	pub lang: Vec<(String, f64)>,
	/// By summed PMI relevance to the features.
	pub pmi: Vec<(String, f64)>,
	/// By probability * relevance.
	pub both: Vec<(String, f64)>,
	/// Relevance summed over every candidate, not only the kept ones.
	pub pmi_total: f64,
}

impl Rankings {
	/// Ranking to sample from in `mode`.
	///
	/// When no candidate has any relevance (`pmi_total == 0`), `Pmi` and
	/// `Both` fall back to the `Lang` ranking.
	pub fn select(&self, mode: Mode) -> &[(String, f64)] {
		match mode {
			Mode::Pmi if self.pmi_total > 0.0 => &self.pmi,
			Mode::Both if self.pmi_total > 0.0 => &self.both,
			Mode::Lang => &self.lang,
			_ => {
				debug!("no relevant candidate, falling back from {mode} to lang");
				&self.lang
			}
		}
	}
}

/// Walks the trigram model token by token, steering it toward the input
/// features with PMI.
///
/// # Responsibilities
/// - Rank the continuations of the current context three ways
/// - Sample the next token among the best ones
/// - Stop on the end sentinel, at `maxlen`, on a dead end or at the deadline
#[derive(Clone)]
pub struct GenerationEngine<'a> {
	model: LanguageModel<'a>,
	scorer: PmiScorer<'a>,
	start_symbols: [String; 2],
	end_symbol: String,
}

impl<'a> GenerationEngine<'a> {
	/// Creates an engine using the sentinels of `config`.
	pub fn new(model: LanguageModel<'a>, scorer: PmiScorer<'a>, config: &ReplyConfig) -> Self {
		Self {
			model,
			scorer,
			start_symbols: config.start_symbols.clone(),
			end_symbol: config.end_symbol.clone(),
		}
	}

	/// Scores every continuation of `(w1, w2)`.
	///
	/// Returns `None` when the context is a dead end.
	pub fn rank<S: AsRef<str>>(&self, w1: &str, w2: &str, features: &[S]) -> Option<Rankings> {
		let distribution = self.model.distribution(w1, w2);
		if distribution.is_empty() {
			return None;
		}

		let mut lang = TopK::new(RANKING_SIZE);
		let mut pmi = TopK::new(RANKING_SIZE);
		let mut both = TopK::new(RANKING_SIZE);
		let mut pmi_total = 0.0;

		for (w3, probability) in distribution.entries {
			let relevance = self.scorer.relevance(features, &w3);
			pmi_total += relevance;
			lang.push(w3.clone(), probability);
			pmi.push(w3.clone(), relevance);
			both.push(w3, probability * relevance);
		}

		Some(Rankings {
			lang: lang.into_sorted_vec(),
			pmi: pmi.into_sorted_vec(),
			both: both.into_sorted_vec(),
			pmi_total,
		})
	}

	/// Chooses the token following `(w1, w2)`.
	///
	/// The token is drawn uniformly among the first `sample_width` entries
	/// of the ranking selected by `mode`. A width of 1 is deterministic.
	pub fn step<S: AsRef<str>, R: Rng>(
		&self,
		context: (&str, &str),
		features: &[S],
		mode: Mode,
		sample_width: usize,
		rng: &mut R,
	) -> Step {
		let (w1, w2) = context;
		let Some(rankings) = self.rank(w1, w2, features) else {
			debug!("dead end after ({w1}, {w2})");
			return Step::DeadEnd;
		};

		let ranking = rankings.select(mode);
		let width = sample_width.clamp(1, ranking.len());
		let index = if width == 1 { 0 } else { rng.random_range(0..width) };
		let token = &ranking[index].0;

		if *token == self.end_symbol {
			Step::Done
		} else {
			Step::Continue(token.clone())
		}
	}

	/// Generates a continuation of `[START0, head]` (or `[START0, START1]`
	/// without head).
	///
	/// The first step always ranks by relevance (`Mode::Pmi`) with
	/// `params.first_sample_width`, which diversifies openings. Every
	/// later step uses `params.mode` deterministically.
	///
	/// # Returns
	/// The generated tokens, never more than `params.maxlen`, with the
	/// reason generation stopped.
	pub fn generate<S: AsRef<str>, R: Rng>(
		&self,
		head: Option<&str>,
		features: &[S],
		params: &GenerationParams,
		rng: &mut R,
	) -> Generation {
		let [start0, start1] = &self.start_symbols;
		let mut w1 = start0.clone();
		let mut w2 = head.unwrap_or(start1.as_str()).to_owned();
		let mut tokens: Vec<String> = Vec::new();

		let termination = loop {
			if tokens.len() >= params.maxlen {
				break Termination::MaxLength;
			}
			if params.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
				warn!("generation deadline reached after {} tokens", tokens.len());
				break Termination::Deadline;
			}

			let (mode, sample_width) = if tokens.is_empty() {
				(Mode::Pmi, params.first_sample_width)
			} else {
				(params.mode, 1)
			};

			match self.step((w1.as_str(), w2.as_str()), features, mode, sample_width, rng) {
				Step::Continue(token) => {
					tokens.push(token.clone());
					w1 = std::mem::replace(&mut w2, token);
				}
				Step::Done => break Termination::End,
				Step::DeadEnd => break Termination::DeadEnd,
			}
		};

		Generation { tokens, termination }
	}
}
