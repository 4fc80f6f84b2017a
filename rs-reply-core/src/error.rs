use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors surfaced by the reply engine.
///
/// Only misuse ends up here: a broken configuration, an unreadable data
/// directory or a malformed table dump. Expected generation outcomes
/// (dead ends, inputs without any head candidate, unseen token pairs)
/// are plain values and never reach this type.
#[derive(Error, Debug)]
pub enum ReplyError {
	/// The configuration is inconsistent (see `ReplyConfig::validate`).
	#[error("invalid configuration: {0}")]
	Config(String),

	/// The configuration file could not be decoded.
	#[error("cannot parse configuration: {0}")]
	ConfigFormat(#[from] serde_json::Error),

	/// A row of a table dump could not be parsed.
	#[error("{}:{line}: {reason}", .path.display())]
	MalformedRow {
		path: PathBuf,
		line: usize,
		reason: String,
	},

	/// The count store cannot be opened.
	#[error("store unavailable: {0}")]
	StoreUnavailable(String),

	/// The binary store cache could not be encoded or decoded.
	#[error("store cache codec error: {0}")]
	Codec(#[from] postcard::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
