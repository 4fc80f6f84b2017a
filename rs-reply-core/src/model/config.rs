use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReplyError;

/// Ranking used to pick the next token during generation.
///
/// # Variants
/// - `Lang`: language-model likelihood only.
/// - `Pmi`: relevance to the input features only.
/// - `Both`: product of likelihood and relevance.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	Lang,
	Pmi,
	#[default]
	Both,
}

impl FromStr for Mode {
	type Err = ReplyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"lang" => Ok(Mode::Lang),
			"pmi" => Ok(Mode::Pmi),
			"both" => Ok(Mode::Both),
			other => Err(ReplyError::Config(format!(
				"mode must be 'lang', 'pmi' or 'both', got '{other}'"
			))),
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Mode::Lang => "lang",
			Mode::Pmi => "pmi",
			Mode::Both => "both",
		})
	}
}

/// How many generations are run per head, and which one is kept.
///
/// # Variants
/// - `Single`: one generation per head.
/// - `ShortestOf { trials }`: `trials` independent generations, the
///   shortest continuation wins (long walks tend to ramble).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Strategy {
	Single,
	ShortestOf { trials: usize },
}

impl Strategy {
	pub fn trials(&self) -> usize {
		match self {
			Strategy::Single => 1,
			Strategy::ShortestOf { trials } => *trials,
		}
	}
}

impl Default for Strategy {
	fn default() -> Self {
		Strategy::ShortestOf { trials: 10 }
	}
}

/// Reply generation settings.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides. Call [`validate`](Self::validate) (done by
/// `ReplyOrchestrator::new`) before use.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ReplyConfig {
	/// Part-of-speech tags whose tokens are used as input features.
	pub content_pos: BTreeSet<String>,

	/// Two distinct sentinels seeding the trigram context.
	pub start_symbols: [String; 2],

	/// Sentinel closing a sentence.
	pub end_symbol: String,

	/// Maximum number of generated tokens after the seed.
	pub maxlen: usize,

	/// Largest `maxlen` accepted by [`set_maxlen`](Self::set_maxlen) and
	/// [`validate`](Self::validate).
	pub maxlen_cap: usize,

	/// Maximum number of heads (hence replies) per request.
	pub num_heads: usize,

	/// Ranking used after the first step.
	pub mode: Mode,

	/// Width of the uniform sampling window on the first step. Later
	/// steps always take the best candidate.
	first_sample_width: usize,

	pub strategy: Strategy,

	/// Inserted between tokens when a reply is rendered as text.
	pub separator: String,

	/// Wall-clock budget of one request, in milliseconds.
	pub deadline_ms: Option<u64>,

	/// Run heads and trials on worker threads.
	pub parallel: bool,
}

impl Default for ReplyConfig {
	fn default() -> Self {
		Self {
			content_pos: ["NOUN", "PROPN", "VERB", "ADJ"].iter().map(|s| (*s).to_owned()).collect(),
			start_symbols: ["<BOS0>".to_owned(), "<BOS1>".to_owned()],
			end_symbol: "<EOS>".to_owned(),
			maxlen: 40,
			maxlen_cap: 1000,
			num_heads: 5,
			mode: Mode::Both,
			first_sample_width: 1,
			strategy: Strategy::default(),
			separator: String::new(),
			deadline_ms: None,
			parallel: true,
		}
	}
}

impl ReplyConfig {
	/// Loads a JSON configuration file and validates it.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReplyError> {
		let text = fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&text)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks the invariants the engine relies on.
	///
	/// # Errors
	/// Returns `ReplyError::Config` if
	/// - a sentinel is empty, or two sentinels are equal
	/// - `maxlen` is above `maxlen_cap`
	/// - `first_sample_width` is 0
	/// - `num_heads` is 0
	/// - the strategy asks for 0 trials
	pub fn validate(&self) -> Result<(), ReplyError> {
		let [start0, start1] = &self.start_symbols;
		let sentinels = [start0, start1, &self.end_symbol];
		if sentinels.iter().any(|s| s.is_empty()) {
			return Err(ReplyError::Config("sentinels cannot be empty".to_owned()));
		}
		if start0 == start1 || start0 == &self.end_symbol || start1 == &self.end_symbol {
			return Err(ReplyError::Config("sentinels must be distinct".to_owned()));
		}
		if self.maxlen > self.maxlen_cap {
			return Err(ReplyError::Config(format!(
				"maxlen must be <= {}, got {}",
				self.maxlen_cap, self.maxlen
			)));
		}
		if self.first_sample_width == 0 {
			return Err(ReplyError::Config("first_sample_width must be >= 1".to_owned()));
		}
		if self.num_heads == 0 {
			return Err(ReplyError::Config("num_heads must be >= 1".to_owned()));
		}
		if self.strategy.trials() == 0 {
			return Err(ReplyError::Config("strategy needs at least one trial".to_owned()));
		}
		Ok(())
	}

	pub fn first_sample_width(&self) -> usize {
		self.first_sample_width
	}

	/// Sets `maxlen`, at most `maxlen_cap`.
	pub fn set_maxlen(&mut self, maxlen: usize) -> Result<(), ReplyError> {
		if maxlen > self.maxlen_cap {
			return Err(ReplyError::Config(format!(
				"maxlen must be <= {}, got {maxlen}",
				self.maxlen_cap
			)));
		}
		self.maxlen = maxlen;
		Ok(())
	}

	/// Sets the sampling width of the first step (>= 1).
	pub fn set_first_sample_width(&mut self, width: usize) -> Result<(), ReplyError> {
		if width == 0 {
			return Err(ReplyError::Config("first_sample_width must be >= 1".to_owned()));
		}
		self.first_sample_width = width;
		Ok(())
	}

	/// Sets the mode from its name (`lang`, `pmi` or `both`).
	pub fn set_mode(&mut self, mode: &str) -> Result<(), ReplyError> {
		self.mode = mode.parse()?;
		Ok(())
	}

	pub fn set_num_heads(&mut self, num_heads: usize) -> Result<(), ReplyError> {
		if num_heads == 0 {
			return Err(ReplyError::Config("num_heads must be >= 1".to_owned()));
		}
		self.num_heads = num_heads;
		Ok(())
	}

	pub fn set_strategy(&mut self, strategy: Strategy) -> Result<(), ReplyError> {
		if strategy.trials() == 0 {
			return Err(ReplyError::Config("strategy needs at least one trial".to_owned()));
		}
		self.strategy = strategy;
		Ok(())
	}

	pub fn deadline(&self) -> Option<Duration> {
		self.deadline_ms.map(Duration::from_millis)
	}
}
