use std::collections::{HashMap, HashSet};

use crate::nlp::{is_stopword, tokenize};
use super::dictionary::{Dictionary, Tiki};

/// Sentences sharing tokens with a steering input.
///
/// A sentence is *slightly relevant* when it shares any token with the input,
/// and also *relevant* when one of the shared tokens is not a stopword. Each
/// list keeps corpus order and holds a sentence at most once.
#[derive(Debug, Default)]
pub struct Relevance<'a> {
	pub relevant: Vec<&'a [Tiki]>,
	pub slightly_relevant: Vec<&'a [Tiki]>,
}

/// Splits `sentences` by token overlap with `input` (case-insensitive).
pub fn find_relevant<'a, I>(sentences: I, dictionary: &Dictionary, input: &str) -> Relevance<'a>
where
	I: IntoIterator<Item = &'a [Tiki]>,
{
	let wanted: HashSet<String> = tokenize(input).into_iter().map(str::to_lowercase).collect();

	// Every dictionary entry matching an input token, with its stopword flag
	let matching: HashMap<Tiki, bool> = dictionary
		.iter()
		.filter(|(_, token)| wanted.contains(&token.to_lowercase()))
		.map(|(tiki, token)| (tiki, is_stopword(token)))
		.collect();

	let mut relevance = Relevance::default();
	if matching.is_empty() {
		return relevance;
	}

	for sentence in sentences {
		let mut shared = false;
		let mut meaningful = false;
		for tiki in sentence {
			if let Some(&stopword) = matching.get(tiki) {
				shared = true;
				meaningful |= !stopword;
			}
		}

		if shared {
			relevance.slightly_relevant.push(sentence);
		}
		if meaningful {
			relevance.relevant.push(sentence);
		}
	}

	relevance
}
