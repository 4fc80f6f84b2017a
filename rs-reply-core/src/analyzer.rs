use std::collections::{BTreeSet, HashSet};

/// A token produced by a syntactic analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub surface: String,
	/// Part-of-speech tag, empty when the analyzer could not tag the token.
	pub pos: String,
}

impl Token {
	pub fn new(surface: &str, pos: &str) -> Self {
		Self { surface: surface.to_owned(), pos: pos.to_owned() }
	}
}

/// Splits a sentence into part-of-speech tagged tokens.
///
/// Real deployments plug a morphological or dependency analyzer in here.
pub trait Analyzer: Send + Sync {
	fn parse(&self, sentence: &str) -> Vec<Token>;
}

/// Analyzer for text that is already tagged: `surface/POS surface/POS ...`.
///
/// The tag is taken after the last `/`, so surfaces may contain slashes.
/// A token without a tag gets an empty tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedTextAnalyzer;

impl Analyzer for TaggedTextAnalyzer {
	fn parse(&self, sentence: &str) -> Vec<Token> {
		sentence
			.split_whitespace()
			.map(|word| match word.rsplit_once('/') {
				Some((surface, pos)) if !surface.is_empty() => Token::new(surface, pos),
				_ => Token::new(word, ""),
			})
			.collect()
	}
}

/// Surfaces of the content tokens, deduplicated in first-seen order.
pub fn extract_features(tokens: &[Token], content_pos: &BTreeSet<String>) -> Vec<String> {
	let mut seen = HashSet::new();
	tokens
		.iter()
		.filter(|token| !token.pos.is_empty() && content_pos.contains(&token.pos))
		.filter(|token| seen.insert(token.surface.as_str()))
		.map(|token| token.surface.clone())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_tagged_text() {
		let tokens = TaggedTextAnalyzer.parse("I/PRON love/VERB  and/or/CCONJ tea");
		assert_eq!(
			tokens,
			vec![
				Token::new("I", "PRON"),
				Token::new("love", "VERB"),
				Token::new("and/or", "CCONJ"),
				Token::new("tea", ""),
			]
		);
		assert!(TaggedTextAnalyzer.parse("   ").is_empty());
	}

	#[test]
	fn features_keep_content_words_once() {
		let pos: BTreeSet<String> = ["NOUN", "VERB"].iter().map(|s| (*s).to_owned()).collect();
		let tokens = TaggedTextAnalyzer.parse("tea/NOUN is/AUX tea/NOUN drink/VERB it/PRON");
		assert_eq!(extract_features(&tokens, &pos), vec!["tea".to_owned(), "drink".to_owned()]);
	}

	#[test]
	fn untagged_tokens_are_never_features() {
		let pos: BTreeSet<String> = BTreeSet::new();
		let tokens = TaggedTextAnalyzer.parse("tea coffee");
		assert!(extract_features(&tokens, &pos).is_empty());
	}
}
