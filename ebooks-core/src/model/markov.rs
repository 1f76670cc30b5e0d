use std::collections::HashMap;

use log::warn;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::{EbooksError, EbooksResult};
use crate::nlp::decode_entities;
use super::corpus_model::Model;
use super::dictionary::Tiki;
use super::suffix_generator::{Next, Occurrence};
use super::synthesis_input::SynthesisInput;

/// Token-by-token random walk over the corpus sentences.
///
/// Contexts are keyed by the previous token, `None` standing for the start of
/// a sentence. Each step samples a recorded occurrence uniformly: from the
/// two-token context when it offers at least two options, from the one-token
/// context otherwise. The walk ends on a sentence ending or after
/// `max_tokens` tokens.
#[derive(Debug)]
pub struct MarkovChain<'a> {
	sentences: Vec<&'a [Tiki]>,
	unigrams: HashMap<Option<Tiki>, Vec<Occurrence>>,
	bigrams: HashMap<(Option<Tiki>, Tiki), Vec<Occurrence>>,
}

impl<'a> MarkovChain<'a> {
	/// Builds the transition tables.
	///
	/// # Errors
	/// Returns `EmptyCorpus` if there is no sentence at all.
	pub fn build<I>(sentences: I) -> EbooksResult<Self>
	where
		I: IntoIterator<Item = &'a [Tiki]>,
	{
		let sentences: Vec<&'a [Tiki]> = sentences.into_iter().filter(|s| !s.is_empty()).collect();
		if sentences.is_empty() {
			return Err(EbooksError::EmptyCorpus);
		}

		let mut unigrams: HashMap<Option<Tiki>, Vec<Occurrence>> = HashMap::new();
		let mut bigrams: HashMap<(Option<Tiki>, Tiki), Vec<Occurrence>> = HashMap::new();

		for (i, tokens) in sentences.iter().enumerate() {
			let mut previous = None;
			for (j, &token) in tokens.iter().enumerate() {
				unigrams.entry(previous).or_default().push(Occurrence { sentence: i, next: Next::At(j) });

				let next = if j == tokens.len() - 1 {
					unigrams.entry(Some(token)).or_default().push(Occurrence { sentence: i, next: Next::End });
					Next::End
				} else {
					Next::At(j + 1)
				};
				bigrams.entry((previous, token)).or_default().push(Occurrence { sentence: i, next });

				previous = Some(token);
			}
		}

		Ok(Self { sentences, unigrams, bigrams })
	}

	/// Walks the chain from a sentence start.
	pub fn generate<R: Rng>(&self, max_tokens: usize, rng: &mut R) -> Vec<Tiki> {
		let mut tokens = Vec::new();
		let mut previous: Option<Tiki> = None;
		let mut current: Option<Tiki> = None;

		while tokens.len() < max_tokens {
			let options = match current {
				None => self.unigrams.get(&None),
				Some(token) => self
					.bigrams
					.get(&(previous, token))
					.filter(|options| options.len() >= 2)
					.or_else(|| self.unigrams.get(&Some(token))),
			};

			let Some(step) = options.and_then(|options| options.choose(rng)) else {
				break;
			};
			let Next::At(position) = step.next else {
				break;
			};

			let token = self.sentences[step.sentence][position];
			tokens.push(token);
			previous = current;
			current = Some(token);
		}

		tokens
	}
}

impl Model {
	/// Produces a statement with the Markov chain instead of suffix exchange.
	///
	/// Retries until a candidate passes [`Model::is_valid`], up to
	/// `retry_limit` retries, then settles for the last one cut to the limit.
	///
	/// # Errors
	/// Returns `EmptyCorpus` if the model has no sentence.
	pub fn make_chain<R: Rng>(&self, input: &SynthesisInput, rng: &mut R) -> EbooksResult<String> {
		let chain = MarkovChain::build(self.sentences())?;

		// Every token takes at least one character
		let max_tokens = input.limit();
		let mut tokens = chain.generate(max_tokens, rng);
		let mut retries = 0;
		while !self.is_valid(&tokens, input.limit()) {
			if retries == input.retry_limit {
				warn!("no valid chain after {} attempts, trimming", retries + 1);
				while !tokens.is_empty() && self.reconstruct(&tokens).chars().count() > input.limit() {
					tokens.pop();
				}
				break;
			}
			tokens = chain.generate(max_tokens, rng);
			retries += 1;
		}

		Ok(decode_entities(&self.reconstruct(&tokens)))
	}
}
