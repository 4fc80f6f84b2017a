use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::env;

use crate::error::ReplyError;

/// Name of the binary cache written next to the table dumps.
pub(crate) const CACHE_FILE: &str = "store.bin";

/// Reads a table dump and returns its non-empty lines.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Keeps the 1-based line number of every kept line for error reporting
pub(crate) fn read_lines<P: AsRef<Path>>(filename: P) -> Result<Vec<(usize, String)>, ReplyError> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents
		.lines()
		.enumerate()
		.filter(|(_, line)| !line.trim().is_empty())
		.map(|(i, line)| (i + 1, line.to_owned()))
		.collect())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Resolves the data directory and checks that it exists.
pub(crate) fn data_folder<P: AsRef<Path>>(input: P) -> Result<PathBuf, ReplyError> {
	let folder = normalize_folder(input);
	if !folder.is_dir() {
		return Err(ReplyError::StoreUnavailable(format!(
			"expected a directory, got: {}",
			folder.display()
		)));
	}
	Ok(folder)
}
