use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::info;
use serde::{Deserialize, Serialize};

use super::{HeadRelationTable, MarginalTables, TrigramTable};
use crate::error::ReplyError;
use crate::io::{CACHE_FILE, data_folder, read_lines};

/// Association dump: `source \t target \t count`.
pub const ASSOCIATION_FILE: &str = "pmi.tsv";
/// Trigram dump: `w1 \t w2 \t w3 \t count`.
pub const TRIGRAM_FILE: &str = "chain.tsv";
/// Head-relation dump: `feature \t head \t count`.
pub const HEAD_RELATION_FILE: &str = "head_rel.tsv";

/// All count tables needed to answer a reply request.
///
/// The store is built once (from table dumps or from its binary cache)
/// and then only read. Share it by reference across threads.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CountStore {
	associations: MarginalTables,
	trigrams: TrigramTable,
	head_relations: HeadRelationTable,
}

/// One parsed dump row: its key columns and its count.
struct Row {
	keys: Vec<String>,
	count: u64,
}

impl CountStore {
	/// Returns an empty store, to be filled with the `add_*` methods.
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens a data directory.
	///
	/// - If `store.bin` exists, decodes it with `postcard`.
	/// - Otherwise parses the three table dumps (`pmi.tsv`, `chain.tsv`,
	///   `head_rel.tsv`) and writes `store.bin` for the next start.
	///
	/// # Errors
	/// - `StoreUnavailable` if the directory or one of the dumps is missing
	/// - `MalformedRow` if a dump contains an unparsable row
	/// - `Codec` / `Io` if the cache cannot be read or written
	///
	/// # Notes
	/// The cache is not invalidated when dumps change: delete `store.bin`
	/// after re-running the offline counters.
	pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, ReplyError> {
		let folder = data_folder(dir)?;
		let cache = folder.join(CACHE_FILE);

		let store: Self = if cache.exists() {
			let bytes = fs::read(&cache)?;
			postcard::from_bytes(&bytes)?
		} else {
			let store = Self::read_dumps(&folder)?;
			fs::write(&cache, postcard::to_stdvec(&store)?)?;
			store
		};

		info!(
			"count store loaded from {}: {} association pairs, {} trigram contexts, {} head features",
			folder.display(),
			store.associations.len(),
			store.trigrams.len(),
			store.head_relations.len()
		);
		Ok(store)
	}

	/// Parses the three table dumps of `folder`.
	fn read_dumps(folder: &Path) -> Result<Self, ReplyError> {
		let mut store = Self::new();
		for row in parse_dump(&folder.join(ASSOCIATION_FILE), 2)? {
			store.add_association(&row.keys[0], &row.keys[1], row.count);
		}
		for row in parse_dump(&folder.join(TRIGRAM_FILE), 3)? {
			store.add_trigram(&row.keys[0], &row.keys[1], &row.keys[2], row.count);
		}
		for row in parse_dump(&folder.join(HEAD_RELATION_FILE), 2)? {
			store.add_head_relation(&row.keys[0], &row.keys[1], row.count);
		}
		Ok(store)
	}

	pub fn add_association(&mut self, s: &str, t: &str, count: u64) {
		self.associations.add(s, t, count);
	}

	pub fn add_trigram(&mut self, w1: &str, w2: &str, w3: &str, count: u64) {
		self.trigrams.add(w1, w2, w3, count);
	}

	pub fn add_head_relation(&mut self, feature: &str, head: &str, count: u64) {
		self.head_relations.add(feature, head, count);
	}

	pub fn associations(&self) -> &MarginalTables {
		&self.associations
	}

	pub fn trigrams(&self) -> &TrigramTable {
		&self.trigrams
	}

	pub fn head_relations(&self) -> &HeadRelationTable {
		&self.head_relations
	}
}

/// Reads a dump and parses its rows in parallel chunks.
///
/// # Behavior
/// - Splits the lines into chunks (based on CPU cores * factor).
/// - Parses every chunk on its own scoped thread.
/// - Collects chunks through a channel and restores file order.
///
/// The first malformed row (in file order) is reported.
fn parse_dump(path: &Path, keys: usize) -> Result<Vec<Row>, ReplyError> {
	if !path.is_file() {
		return Err(ReplyError::StoreUnavailable(format!(
			"missing table dump {}",
			path.display()
		)));
	}

	let lines = read_lines(path)?;
	if lines.is_empty() {
		return Ok(Vec::new());
	}

	let factor = 8;
	let chunks = num_cpus::get() * factor;
	let chunk_size = lines.len().div_ceil(chunks);

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for (index, chunk) in lines.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			scope.spawn(move || {
				let parsed: Result<Vec<Row>, ReplyError> = chunk
					.iter()
					.map(|(number, line)| parse_row(path, *number, line, keys))
					.collect();
				// The receiver outlives the scope, sending cannot fail.
				let _ = tx.send((index, parsed));
			});
		}
	});
	drop(tx);

	let mut parts: Vec<(usize, Result<Vec<Row>, ReplyError>)> = rx.iter().collect();
	parts.sort_by_key(|(index, _)| *index);

	let mut rows = Vec::with_capacity(lines.len());
	for (_, part) in parts {
		rows.extend(part?);
	}
	Ok(rows)
}

fn parse_row(path: &Path, line: usize, text: &str, keys: usize) -> Result<Row, ReplyError> {
	let malformed = |reason: String| ReplyError::MalformedRow {
		path: path.to_path_buf(),
		line,
		reason,
	};

	let fields: Vec<&str> = text.split('\t').collect();
	if fields.len() != keys + 1 {
		return Err(malformed(format!(
			"expected {} tab-separated fields, got {}",
			keys + 1,
			fields.len()
		)));
	}
	if fields[..keys].iter().any(|token| token.is_empty()) {
		return Err(malformed("empty token".to_owned()));
	}

	let count: u64 = fields[keys]
		.trim()
		.parse()
		.map_err(|_| malformed(format!("invalid count '{}'", fields[keys])))?;
	if count == 0 {
		return Err(malformed("count must be >= 1".to_owned()));
	}

	Ok(Row {
		keys: fields[..keys].iter().map(|token| (*token).to_owned()).collect(),
		count,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::{AssociationStore, HeadRelationStore, TrigramStore};

	fn write_dumps(dir: &Path) {
		fs::write(dir.join(ASSOCIATION_FILE), "rain\tumbrella\t3\nrain\twet\t1\n").unwrap();
		fs::write(dir.join(TRIGRAM_FILE), "<BOS0>\t<BOS1>\tyes\t2\nyes\t<EOS>\tx\t1\n").unwrap();
		fs::write(dir.join(HEAD_RELATION_FILE), "rain\tyes\t1\n").unwrap();
	}

	#[test]
	fn open_parses_dumps_and_writes_cache() {
		let dir = tempfile::tempdir().unwrap();
		write_dumps(dir.path());

		let store = CountStore::open(dir.path()).unwrap();
		assert!(dir.path().join(CACHE_FILE).exists());
		assert_eq!(store.associations().joint_count("rain", "umbrella"), Some(3));
		assert_eq!(store.associations().source_marginal("rain"), Some(4));
		assert_eq!(store.trigrams().continuations("<BOS0>", "<BOS1>"), vec![("yes".to_owned(), 2)]);
		assert_eq!(store.head_relations().heads_for("rain"), vec![("yes".to_owned(), 1)]);
	}

	#[test]
	fn open_prefers_cache() {
		let dir = tempfile::tempdir().unwrap();
		write_dumps(dir.path());
		CountStore::open(dir.path()).unwrap();

		// Dumps are no longer consulted once the cache exists.
		fs::write(dir.path().join(ASSOCIATION_FILE), "broken row").unwrap();
		let store = CountStore::open(dir.path()).unwrap();
		assert_eq!(store.associations().grand_total(), 4);
	}

	#[test]
	fn malformed_rows_are_reported_with_line() {
		let dir = tempfile::tempdir().unwrap();
		write_dumps(dir.path());
		fs::write(dir.path().join(TRIGRAM_FILE), "a\tb\tc\t1\n\na\tb\tc\n").unwrap();

		match CountStore::open(dir.path()) {
			Err(ReplyError::MalformedRow { line, .. }) => assert_eq!(line, 3),
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn zero_count_is_malformed() {
		let err = parse_row(Path::new("x.tsv"), 1, "a\tb\t0", 2).err().unwrap();
		assert!(matches!(err, ReplyError::MalformedRow { .. }));
	}

	#[test]
	fn missing_dump_is_unavailable() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join(ASSOCIATION_FILE), "").unwrap();

		assert!(matches!(
			CountStore::open(dir.path()),
			Err(ReplyError::StoreUnavailable(_))
		));
	}
}
