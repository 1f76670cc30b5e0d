use log::{debug, warn};
use rand::Rng;

use crate::error::{EbooksError, EbooksResult};
use crate::nlp::{decode_entities, has_unmatched_enclosers};
use super::corpus_model::{Model, Register};
use super::dictionary::Tiki;
use super::relevance::find_relevant;
use super::suffix_generator::{Mode, SuffixGenerator};
use super::synthesis_input::SynthesisInput;

/// Result of one candidate loop.
enum Search {
	/// A candidate passed every check.
	Accepted(Vec<Tiki>),
	/// Attempts ran out; carries the best candidate seen.
	Exhausted(Vec<Tiki>),
}

impl Model {
	/// True if the reconstructed text fits `limit` characters and has no
	/// unbalanced quotes or brackets.
	pub fn is_valid(&self, tokens: &[Tiki], limit: usize) -> bool {
		let text = self.reconstruct(tokens);
		text.chars().count() <= limit && !has_unmatched_enclosers(&text)
	}

	/// Produces a free-standing statement from the whole corpus.
	///
	/// # Errors
	/// Returns `EmptyCorpus` if no sentence has at least two tokens.
	pub fn make_statement<R: Rng>(&self, input: &SynthesisInput, rng: &mut R) -> EbooksResult<String> {
		let generator = SuffixGenerator::build(self.sentences())?;
		Ok(self.synthesize(&generator, input, false, rng))
	}

	/// Produces a reply steered by `text`.
	///
	/// The generator is narrowed to the sentences sharing tokens with `text`:
	/// first the relevant mentions, then the slightly relevant ones, then the
	/// same two tiers over statements. With too little overlap everywhere the
	/// reply is an unconditioned statement.
	///
	/// # Errors
	/// Returns `EmptyCorpus` if the whole corpus has no sentence with at
	/// least two tokens.
	pub fn make_response<R: Rng>(&self, text: &str, input: &SynthesisInput, rng: &mut R) -> EbooksResult<String> {
		for register in [Register::Mention, Register::Statement] {
			let relevance = find_relevant(self.register(register), self.dictionary(), text);
			let tiers = [
				(relevance.relevant, input.relevant_threshold),
				(relevance.slightly_relevant, input.slightly_relevant_threshold),
			];

			for (subset, threshold) in tiers {
				if subset.len() < threshold {
					continue;
				}

				debug!("responding from {} {register:?} sentences", subset.len());
				match SuffixGenerator::build(subset) {
					Ok(generator) => return Ok(self.synthesize(&generator, input, true, rng)),
					// Only single-token matches, try the next tier
					Err(EbooksError::EmptyCorpus) => continue,
					Err(e) => return Err(e),
				}
			}
		}

		self.make_statement(input, rng)
	}

	/// Runs the candidate loops over `generator` and renders the result.
	///
	/// Bigram mode first; if that yields a long verbatim corpus sentence, a
	/// unigram pass looks for a non-verbatim alternative. The returned text
	/// always fits the limit.
	fn synthesize<R: Rng>(&self, generator: &SuffixGenerator, input: &SynthesisInput, responding: bool, rng: &mut R) -> String {
		let mut tokens = match self.search(generator, Mode::Bigram, input, responding, false, rng) {
			Search::Accepted(tokens) | Search::Exhausted(tokens) => tokens,
		};

		if tokens.len() > input.min_tokens && self.is_verbatim(&tokens) {
			debug!("verbatim candidate, retrying in unigram mode");
			match self.search(generator, Mode::Unigram, input, responding, true, rng) {
				Search::Accepted(alternative) => tokens = alternative,
				Search::Exhausted(_) => warn!("no non-verbatim alternative found, keeping corpus sentence"),
			}
		}

		decode_entities(&self.fit(&tokens, input.limit()))
	}

	/// Generates candidates until one is acceptable or attempts run out.
	///
	/// Makes one attempt plus up to `retry_limit` retries. On exhaustion the
	/// best candidate is the most recent valid one, else the last one.
	fn search<R: Rng>(
		&self,
		generator: &SuffixGenerator,
		mode: Mode,
		input: &SynthesisInput,
		responding: bool,
		avoid_verbatim: bool,
		rng: &mut R,
	) -> Search {
		let mut best_valid: Option<Vec<Tiki>> = None;
		let mut last = Vec::new();

		for _ in 0..=input.retry_limit {
			let tokens = generator.generate(input.passes(), mode, rng);

			let valid = self.is_valid(&tokens, input.limit());
			let long_enough = responding || tokens.len() > input.min_tokens;
			let novel = !avoid_verbatim || !self.is_verbatim(&tokens);

			if valid && long_enough && novel {
				return Search::Accepted(tokens);
			}
			if valid {
				best_valid = Some(tokens.clone());
			}
			last = tokens;
		}

		warn!(
			"no acceptable {mode:?} candidate after {} attempts, using best effort",
			input.retry_limit + 1
		);
		Search::Exhausted(best_valid.unwrap_or(last))
	}

	/// Reconstructs `tokens`, dropping trailing tokens until the text fits.
	fn fit(&self, tokens: &[Tiki], limit: usize) -> String {
		let mut end = tokens.len();
		loop {
			let text = self.reconstruct(&tokens[..end]);
			if end == 0 || text.chars().count() <= limit {
				return text;
			}
			end -= 1;
		}
	}
}
