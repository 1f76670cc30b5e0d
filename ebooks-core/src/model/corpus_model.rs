use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::EbooksResult;
use crate::io::{build_output_path, get_filename, read_corpus};
use crate::nlp::{normalize, rank_keywords, segment_sentences, tokenize};
use super::dictionary::{Dictionary, Tiki};

/// Extension of saved model snapshots.
pub const SNAPSHOT_EXTENSION: &str = "model";

/// Partition of the corpus by conversational register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
	/// Free-standing lines.
	Statement,
	/// Lines addressed to someone (they contained an `@` marker).
	Mention,
}

/// Tokenized corpus: dictionary, sentence tables and keywords.
///
/// A model is built once, either by ingesting corpus sources or by loading a
/// snapshot, and is read-only afterwards. Generators borrow its sentences for
/// the duration of one synthesis call.
///
/// # Responsibilities
/// - Filter, normalize, segment and tokenize corpus rows
/// - Intern tokens and store sentences as tiki arrays, split by register
/// - Rank corpus keywords
/// - Save/load the four tables as one postcard snapshot
///
/// # Invariants
/// - Every stored sentence has at least one token
/// - Every stored tiki resolves in `dictionary`
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Model {
	dictionary: Dictionary,
	statements: Vec<Vec<Tiki>>,
	mentions: Vec<Vec<Tiki>>,
	keywords: Vec<String>,
	/// Source name (file stem); not part of the snapshot.
	#[serde(skip)]
	name: String,
}

impl Model {
	/// Ingests one or more corpus sources into a new model.
	///
	/// The format of each source follows its extension (see
	/// [`CorpusFormat`](crate::io::CorpusFormat)). Keywords are ranked once
	/// every source has been consumed.
	///
	/// # Errors
	/// Returns an error if a source cannot be read or its top level parsed.
	/// Individual unusable rows are skipped.
	pub fn ingest<I, P>(paths: I) -> EbooksResult<Self>
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		let mut model = Self::default();

		for path in paths {
			let path = path.as_ref();
			let rows = read_corpus(path)?;
			info!("Consuming {} rows from {}", rows.len(), path.display());

			for row in &rows {
				model.consume_row(row);
			}
			if model.name.is_empty() {
				model.name = get_filename(path)?;
			}
		}

		model.rank_keywords();
		Ok(model)
	}

	/// Builds a model from in-memory corpus rows.
	pub fn from_lines<'l, I>(lines: I) -> Self
	where
		I: IntoIterator<Item = &'l str>,
	{
		let mut model = Self::default();
		for line in lines {
			model.consume_row(line);
		}
		model.rank_keywords();
		model
	}

	/// Opens the model of a corpus source, using its snapshot when present.
	///
	/// - A path with the snapshot extension is loaded directly.
	/// - Otherwise `<stem>.model` next to the source is loaded if it exists,
	///   else the source is ingested and the snapshot written for next time.
	pub fn open<P: AsRef<Path>>(path: P) -> EbooksResult<Self> {
		let path = path.as_ref();
		if path.extension().is_some_and(|e| e == SNAPSHOT_EXTENSION) {
			return Self::load(path);
		}

		let snapshot = build_output_path(path, SNAPSHOT_EXTENSION)?;
		if snapshot.exists() {
			info!("Loading snapshot {}", snapshot.display());
			return Self::load(&snapshot);
		}

		let model = Self::ingest([path])?;
		model.save(&snapshot)?;
		Ok(model)
	}

	/// Writes the dictionary, sentence tables and keywords as a postcard blob.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> EbooksResult<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(&path, bytes)?;
		info!("Saved model to {}", path.as_ref().display());
		Ok(())
	}

	/// Reads a snapshot written by [`Model::save`]. Nothing is re-tokenized.
	pub fn load<P: AsRef<Path>>(path: P) -> EbooksResult<Self> {
		let bytes = std::fs::read(&path)?;
		let mut model: Self = postcard::from_bytes(&bytes)?;
		model.name = get_filename(&path)?;
		Ok(model)
	}

	/// Filters one corpus row and appends its sentences to the right register.
	///
	/// Comment lines (`#...`) and retweets are dropped; a line containing `@`
	/// is a mention. Handles and links are removed before tokenizing.
	fn consume_row(&mut self, row: &str) {
		for line in row.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') || is_retweet(line) {
				debug!("skipping line {line:?}");
				continue;
			}

			let register = if line.contains('@') { Register::Mention } else { Register::Statement };
			let kept: Vec<&str> = line
				.split_whitespace()
				.filter(|word| !word.contains('@') && !word.contains("http"))
				.collect();
			let text = normalize(&kept.join(" "));

			for sentence in segment_sentences(&text) {
				let tikis: Vec<Tiki> = tokenize(sentence)
					.into_iter()
					.map(|token| self.dictionary.tikify(token))
					.collect();
				if tikis.is_empty() {
					continue;
				}

				match register {
					Register::Statement => self.statements.push(tikis),
					Register::Mention => self.mentions.push(tikis),
				}
			}
		}
	}

	fn rank_keywords(&mut self) {
		let keywords = rank_keywords(
			self.sentences()
				.flatten()
				.filter_map(|&tiki| self.dictionary.token_at(tiki)),
		);
		info!(
			"Ranked {} keywords over {} statements and {} mentions",
			keywords.len(),
			self.statements.len(),
			self.mentions.len()
		);
		self.keywords = keywords;
	}

	/// Source name (file stem) of the model, empty for in-memory models.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn dictionary(&self) -> &Dictionary {
		&self.dictionary
	}

	pub fn statements(&self) -> &[Vec<Tiki>] {
		&self.statements
	}

	pub fn mentions(&self) -> &[Vec<Tiki>] {
		&self.mentions
	}

	/// Sentences of one register.
	pub fn register(&self, register: Register) -> impl Iterator<Item = &[Tiki]> {
		let sentences = match register {
			Register::Statement => &self.statements,
			Register::Mention => &self.mentions,
		};
		sentences.iter().map(Vec::as_slice)
	}

	/// All sentences, statements first.
	pub fn sentences(&self) -> impl Iterator<Item = &[Tiki]> {
		self.statements.iter().chain(&self.mentions).map(Vec::as_slice)
	}

	/// Ranked keywords, best first.
	pub fn keywords(&self) -> &[String] {
		&self.keywords
	}

	/// True if `tokens` is exactly one of the corpus sentences.
	pub fn is_verbatim(&self, tokens: &[Tiki]) -> bool {
		self.sentences().any(|sentence| sentence == tokens)
	}

	/// Resolves a tiki sequence to readable text.
	pub fn reconstruct(&self, tokens: &[Tiki]) -> String {
		crate::nlp::reconstruct(&self.dictionary.resolve(tokens))
	}
}

/// Retweets carry a standalone `RT` marker.
fn is_retweet(line: &str) -> bool {
	line.split_whitespace().any(|word| word == "RT")
}
