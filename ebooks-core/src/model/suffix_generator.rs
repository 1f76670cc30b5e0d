use std::collections::{HashMap, HashSet};

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{EbooksError, EbooksResult};
use crate::nlp::is_contiguous_subsequence;
use super::dictionary::Tiki;

/// Context size used to look up splice alternatives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
	/// Match on the single token at the splice point (looser).
	Unigram,
	/// Match on the two tokens ending at the splice point (more fluent).
	#[default]
	Bigram,
}

/// Where a recorded occurrence continues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
	/// The suffix starts at this token position of the source sentence.
	At(usize),
	/// The occurrence is the last token of its sentence.
	End,
}

/// One place a token (or token pair) was seen in the indexed sentences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurrence {
	/// Index into the generator's sentence list.
	pub sentence: usize,
	/// Position right after the matched token(s).
	pub next: Next,
}

/// Recombines sentences by exchanging suffixes at shared tokens.
///
/// Instead of walking a chain token by token, the generator starts from a
/// whole corpus sentence and repeatedly cuts it at a token (or token pair) it
/// shares with another sentence, gluing that sentence's tail in place.
///
/// The adjacency indexes only live as long as one synthesis call: the
/// generator borrows its sentences from the model and is dropped afterwards.
///
/// # Invariants
/// - Every indexed sentence has at least two tokens
/// - `Next::End` never leaks into a generated sequence
#[derive(Debug)]
pub struct SuffixGenerator<'a> {
	sentences: Vec<&'a [Tiki]>,
	unigrams: HashMap<Tiki, Vec<Occurrence>>,
	bigrams: HashMap<(Tiki, Tiki), Vec<Occurrence>>,
}

impl<'a> SuffixGenerator<'a> {
	/// Builds the unigram and bigram indexes over `sentences`.
	///
	/// Sentences shorter than two tokens are ignored.
	///
	/// # Errors
	/// Returns `EmptyCorpus` if no sentence is long enough to be indexed.
	pub fn build<I>(sentences: I) -> EbooksResult<Self>
	where
		I: IntoIterator<Item = &'a [Tiki]>,
	{
		let sentences: Vec<&'a [Tiki]> = sentences.into_iter().filter(|s| s.len() >= 2).collect();
		if sentences.is_empty() {
			return Err(EbooksError::EmptyCorpus);
		}

		let mut unigrams: HashMap<Tiki, Vec<Occurrence>> = HashMap::new();
		let mut bigrams: HashMap<(Tiki, Tiki), Vec<Occurrence>> = HashMap::new();

		for (i, tokens) in sentences.iter().enumerate() {
			let last = tokens.len() - 1;
			for (j, &token) in tokens.iter().enumerate() {
				let next = if j == last { Next::End } else { Next::At(j + 1) };
				let occurrence = Occurrence { sentence: i, next };

				unigrams.entry(token).or_default().push(occurrence);
				if j > 0 {
					bigrams.entry((tokens[j - 1], token)).or_default().push(occurrence);
				}
			}
		}

		Ok(Self { sentences, unigrams, bigrams })
	}

	/// Number of indexed sentences.
	pub fn len(&self) -> usize {
		self.sentences.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sentences.is_empty()
	}

	/// Returns the indexed sentence at `index`.
	pub fn sentence(&self, index: usize) -> Option<&'a [Tiki]> {
		self.sentences.get(index).copied()
	}

	/// Recorded occurrences following `token`.
	pub fn unigram_occurrences(&self, token: Tiki) -> &[Occurrence] {
		self.unigrams.get(&token).map(Vec::as_slice).unwrap_or_default()
	}

	/// Recorded occurrences following the pair `(first, second)`.
	pub fn bigram_occurrences(&self, first: Tiki, second: Tiki) -> &[Occurrence] {
		self.bigrams.get(&(first, second)).map(Vec::as_slice).unwrap_or_default()
	}

	/// Generates a token sequence by suffix exchange.
	///
	/// Starts from a random indexed sentence and performs up to `passes`
	/// splices. A pass picks a random variation site (an adjacent pair with an
	/// unused alternative continuation) and a random alternative there, and
	/// keeps the first candidate that neither contains nor is contained in a
	/// sentence already consulted. Generation stops early when a pass has no
	/// variation site or no acceptable candidate.
	pub fn generate<R: Rng>(&self, passes: usize, mode: Mode, rng: &mut R) -> Vec<Tiki> {
		let seed = rng.random_range(0..self.sentences.len());
		let mut tokens: Vec<Tiki> = self.sentences[seed].to_vec();
		let mut used: HashSet<usize> = HashSet::from([seed]);
		let mut verbatim: Vec<&[Tiki]> = vec![self.sentences[seed]];

		for pass in 0..passes {
			let mut sites = self.variation_sites(&tokens, mode, &used);
			if sites.is_empty() {
				debug!("pass {pass}: no variation site left");
				break;
			}

			sites.shuffle(rng);

			let mut accepted = None;
			'sites: for (site, alternatives) in &mut sites {
				alternatives.shuffle(rng);

				for alternative in alternatives.iter() {
					let Next::At(start) = alternative.next else {
						continue;
					};
					let source = self.sentences[alternative.sentence];

					let mut candidate = tokens[..=*site + 1].to_vec();
					candidate.extend_from_slice(&source[start..]);

					// Reject candidates that merely rebuild a slice of a consulted sentence
					let rebuilt = verbatim.iter().any(|&v| {
						is_contiguous_subsequence(v, candidate.as_slice())
							|| is_contiguous_subsequence(candidate.as_slice(), v)
					});
					if !rebuilt {
						accepted = Some((alternative.sentence, candidate));
						break 'sites;
					}
				}
			}

			match accepted {
				Some((sentence, candidate)) => {
					debug!("pass {pass}: spliced sentence {sentence}");
					used.insert(sentence);
					verbatim.push(self.sentences[sentence]);
					tokens = candidate;
				}
				None => {
					debug!("pass {pass}: no acceptable candidate");
					break;
				}
			}
		}

		tokens
	}

	/// Collects the positions of `tokens` that still have unused alternatives.
	///
	/// Site `i` refers to the pair `(tokens[i], tokens[i + 1])`.
	fn variation_sites(&self, tokens: &[Tiki], mode: Mode, used: &HashSet<usize>) -> Vec<(usize, Vec<Occurrence>)> {
		tokens
			.windows(2)
			.enumerate()
			.filter_map(|(i, pair)| {
				let occurrences = match mode {
					Mode::Unigram => self.unigram_occurrences(pair[1]),
					Mode::Bigram => self.bigram_occurrences(pair[0], pair[1]),
				};
				let alternatives: Vec<Occurrence> = occurrences
					.iter()
					.filter(|o| o.next != Next::End && !used.contains(&o.sentence))
					.copied()
					.collect();
				(!alternatives.is_empty()).then_some((i, alternatives))
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn sentences() -> Vec<Vec<Tiki>> {
		// 0 1 2 3 4 / 5 1 2 6 7 / 8 2 6 9 / 10
		vec![vec![0, 1, 2, 3, 4], vec![5, 1, 2, 6, 7], vec![8, 2, 6, 9], vec![10]]
	}

	#[test]
	fn build_indexes_positions_and_endings() {
		let corpus = sentences();
		let generator = SuffixGenerator::build(corpus.iter().map(Vec::as_slice)).unwrap();

		// The single-token sentence is not indexed
		assert_eq!(generator.len(), 3);
		assert!(generator.unigram_occurrences(10).is_empty());

		assert_eq!(
			generator.unigram_occurrences(2),
			&[
				Occurrence { sentence: 0, next: Next::At(3) },
				Occurrence { sentence: 1, next: Next::At(3) },
				Occurrence { sentence: 2, next: Next::At(2) },
			]
		);
		assert_eq!(generator.unigram_occurrences(4), &[Occurrence { sentence: 0, next: Next::End }]);
		assert_eq!(
			generator.bigram_occurrences(1, 2),
			&[
				Occurrence { sentence: 0, next: Next::At(3) },
				Occurrence { sentence: 1, next: Next::At(3) },
			]
		);
		assert!(generator.bigram_occurrences(0, 2).is_empty());
	}

	#[test]
	fn build_fails_without_indexable_sentences() {
		let corpus: Vec<Vec<Tiki>> = vec![vec![1], vec![2]];
		let result = SuffixGenerator::build(corpus.iter().map(Vec::as_slice));
		assert!(matches!(result, Err(EbooksError::EmptyCorpus)));
	}

	#[test]
	fn generate_without_alternatives_returns_a_corpus_sentence() {
		let corpus: Vec<Vec<Tiki>> = vec![vec![0, 1, 2], vec![3, 4, 5]];
		let generator = SuffixGenerator::build(corpus.iter().map(Vec::as_slice)).unwrap();
		let mut rng = StdRng::seed_from_u64(7);

		for mode in [Mode::Bigram, Mode::Unigram] {
			let tokens = generator.generate(5, mode, &mut rng);
			assert!(corpus.contains(&tokens));
		}
	}

	#[test]
	fn generate_splices_on_shared_bigram() {
		let corpus: Vec<Vec<Tiki>> = vec![vec![0, 1, 2, 3], vec![4, 1, 2, 5, 6]];
		let generator = SuffixGenerator::build(corpus.iter().map(Vec::as_slice)).unwrap();

		for seed in 0..20 {
			let mut rng = StdRng::seed_from_u64(seed);
			let tokens = generator.generate(3, Mode::Bigram, &mut rng);
			assert!(
				tokens == vec![0, 1, 2, 5, 6] || tokens == vec![4, 1, 2, 3],
				"unexpected splice {tokens:?}"
			);
		}
	}

	#[test]
	fn generate_is_reproducible_with_a_seed() {
		let corpus = sentences();
		let generator = SuffixGenerator::build(corpus.iter().map(Vec::as_slice)).unwrap();

		let first = generator.generate(3, Mode::Unigram, &mut StdRng::seed_from_u64(42));
		let second = generator.generate(3, Mode::Unigram, &mut StdRng::seed_from_u64(42));
		assert_eq!(first, second);
	}

	#[test]
	fn generated_tokens_come_from_indexed_sentences() {
		let corpus = sentences();
		let generator = SuffixGenerator::build(corpus.iter().map(Vec::as_slice)).unwrap();
		let known: HashSet<Tiki> = corpus[..3].iter().flatten().copied().collect();

		for seed in 0..50 {
			let mut rng = StdRng::seed_from_u64(seed);
			let tokens = generator.generate(5, Mode::Unigram, &mut rng);
			assert!(tokens.len() >= 2);
			assert!(tokens.iter().all(|t| known.contains(t)));
		}
	}
}
