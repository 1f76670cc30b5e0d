use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Integer handle of a token inside a [`Dictionary`].
pub type Tiki = u32;

/// Append-only token dictionary.
///
/// Every distinct token string is stored once; the rest of the model refers to
/// it by its position (its "tiki"), which keeps sentences compact and makes
/// token comparison an integer comparison.
///
/// ## Responsibilities:
/// - Intern tokens (`tikify`)
/// - Resolve tikis back to strings (`token_at`)
///
/// ## Invariants
/// - `tokens` never shrinks nor reorders, so tikis are stable
/// - `index[tokens[i]] == i` for every `i`
///
/// Only the token list is serialized; the reverse index is rebuilt on load.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Dictionary {
	/// Tokens in insertion order.
	tokens: Vec<String>,
	/// Reverse map, kept in lockstep with `tokens`.
	index: HashMap<String, Tiki>,
}

impl Dictionary {
	/// Creates an empty dictionary.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the tiki of `token`, interning it first if it is new.
	pub fn tikify(&mut self, token: &str) -> Tiki {
		if let Some(&tiki) = self.index.get(token) {
			return tiki;
		}

		let tiki = self.tokens.len() as Tiki;
		self.tokens.push(token.to_owned());
		self.index.insert(token.to_owned(), tiki);
		tiki
	}

	/// Returns the tiki of an already known token.
	pub fn get(&self, token: &str) -> Option<Tiki> {
		self.index.get(token).copied()
	}

	/// Returns the token behind `tiki`, if any.
	pub fn token_at(&self, tiki: Tiki) -> Option<&str> {
		self.tokens.get(tiki as usize).map(String::as_str)
	}

	/// Resolves a tiki sequence to token strings, skipping unknown tikis.
	pub fn resolve(&self, tikis: &[Tiki]) -> Vec<&str> {
		tikis.iter().filter_map(|&tiki| self.token_at(tiki)).collect()
	}

	/// Iterates over `(tiki, token)` pairs in tiki order.
	pub fn iter(&self) -> impl Iterator<Item = (Tiki, &str)> {
		self.tokens
			.iter()
			.enumerate()
			.map(|(i, token)| (i as Tiki, token.as_str()))
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

impl From<Vec<String>> for Dictionary {
	fn from(tokens: Vec<String>) -> Self {
		let index = tokens
			.iter()
			.enumerate()
			.map(|(i, token)| (token.clone(), i as Tiki))
			.collect();
		Self { tokens, index }
	}
}

impl From<Dictionary> for Vec<String> {
	fn from(dictionary: Dictionary) -> Self {
		dictionary.tokens
	}
}
