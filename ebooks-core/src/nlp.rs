use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Punctuation handled as standalone tokens.
///
/// Kept deliberately small: anything else stays part of its word, which is
/// consistent enough for short informal text.
pub const PUNCTUATION: &str = ".?!,";

/// Maximum number of keywords kept by `rank_keywords`.
pub const MAX_KEYWORDS: usize = 200;

/// Longest entity body (between `&` and `;`) `decode_entities` will look at.
const MAX_ENTITY_LEN: usize = 10;

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	[
		"a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
		"aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
		"both", "but", "by", "can", "can't", "cannot", "could", "couldn't", "did", "didn't", "do",
		"does", "doesn't", "doing", "don't", "down", "during", "each", "few", "for", "from",
		"further", "had", "hadn't", "has", "hasn't", "have", "haven't", "having", "he", "he'd",
		"he'll", "he's", "her", "here", "here's", "hers", "herself", "him", "himself", "his",
		"how", "how's", "i", "i'd", "i'll", "i'm", "i've", "if", "in", "into", "is", "isn't", "it",
		"it's", "its", "itself", "just", "let's", "me", "more", "most", "mustn't", "my", "myself",
		"no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "ought",
		"our", "ours", "ourselves", "out", "over", "own", "same", "shan't", "she", "she'd",
		"she'll", "she's", "should", "shouldn't", "so", "some", "such", "than", "that", "that's",
		"the", "their", "theirs", "them", "themselves", "then", "there", "there's", "these",
		"they", "they'd", "they'll", "they're", "they've", "this", "those", "through", "to",
		"too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd", "we'll", "we're",
		"we've", "were", "weren't", "what", "what's", "when", "when's", "where", "where's",
		"which", "while", "who", "who's", "whom", "why", "why's", "will", "with", "won't",
		"would", "wouldn't", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
		"yourself", "yourselves", "rt", "via", "yeah", "yes", "ok", "okay", "oh", "lol",
	]
	.into_iter()
	.collect()
});

/// Paired delimiters checked by `has_unmatched_enclosers`, as (opener, closer) patterns.
static ENCLOSERS: LazyLock<Vec<(Regex, Regex)>> = LazyLock::new(|| {
	["**", "\"\"", "()", "[]", "``", "''"]
		.iter()
		.map(|pair| {
			let (open, close) = pair.split_at(1);
			// Built from constant pairs, cannot fail
			let opener = Regex::new(&format!(r"(\W|^){}\S", regex::escape(open))).unwrap();
			let closer = Regex::new(&format!(r"\S{}(\W|$)", regex::escape(close))).unwrap();
			(opener, closer)
		})
		.collect()
});

/// Rewrites "smart" punctuation to plain ASCII and decodes HTML entities.
pub fn normalize(text: &str) -> String {
	let plain = text
		.replace(['\u{201C}', '\u{201D}'], "\"")
		.replace(['\u{2018}', '\u{2019}'], "'")
		.replace('\u{2026}', "...");
	decode_entities(&plain)
}

/// Decodes HTML-style character entities.
///
/// Handles the common named entities plus decimal (`&#39;`) and hex
/// (`&#x27;`) references. Unknown or malformed entities are kept verbatim.
pub fn decode_entities(text: &str) -> String {
	let mut decoded = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(amp) = rest.find('&') {
		decoded.push_str(&rest[..amp]);
		let tail = &rest[amp..];

		let entity = tail[1..]
			.find(';')
			.filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
			.and_then(|end| decode_entity(&tail[1..=end]).map(|c| (c, end + 2)));

		match entity {
			Some((c, consumed)) => {
				decoded.push(c);
				rest = &tail[consumed..];
			}
			None => {
				decoded.push('&');
				rest = &tail[1..];
			}
		}
	}

	decoded.push_str(rest);
	decoded
}

fn decode_entity(name: &str) -> Option<char> {
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{A0}'),
		"hellip" => Some('\u{2026}'),
		"lsquo" => Some('\u{2018}'),
		"rsquo" => Some('\u{2019}'),
		"ldquo" => Some('\u{201C}'),
		"rdquo" => Some('\u{201D}'),
		"ndash" => Some('\u{2013}'),
		"mdash" => Some('\u{2014}'),
		"laquo" => Some('\u{AB}'),
		"raquo" => Some('\u{BB}'),
		"middot" => Some('\u{B7}'),
		"bull" => Some('\u{2022}'),
		"copy" => Some('\u{A9}'),
		"reg" => Some('\u{AE}'),
		"trade" => Some('\u{2122}'),
		"deg" => Some('\u{B0}'),
		"euro" => Some('\u{20AC}'),
		"pound" => Some('\u{A3}'),
		_ => {
			let number = name.strip_prefix('#')?;
			let code = match number.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse::<u32>().ok()?,
			};
			char::from_u32(code)
		}
	}
}

/// Splits text into sentences.
///
/// Breaks on newlines, or on the whitespace run right after `.`, `?` or `!`.
/// This ad hoc rule copes with short informal text better than a real
/// segmenter would; consistency matters more than correctness here.
/// Returned slices are trimmed and never empty.
pub fn segment_sentences(text: &str) -> Vec<&str> {
	let mut sentences = Vec::new();
	let mut start = 0;
	let mut prev: Option<char> = None;
	let mut chars = text.char_indices().peekable();

	while let Some((i, c)) = chars.next() {
		let boundary = c == '\n' || (c.is_whitespace() && matches!(prev, Some('.' | '?' | '!')));
		if !boundary {
			prev = Some(c);
			continue;
		}

		sentences.push(&text[start..i]);

		// Swallow the whole separator run
		start = text.len();
		while let Some(&(j, next)) = chars.peek() {
			if !next.is_whitespace() {
				start = j;
				break;
			}
			chars.next();
		}
		prev = None;
	}
	sentences.push(&text[start..]);

	sentences
		.into_iter()
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.collect()
}

/// Splits a sentence into word-level tokens.
///
/// Splits on whitespace. A word followed by whitespace whose trailing
/// punctuation run directly follows an ASCII letter is split in two
/// (`"Hi! How"` gives `Hi`, `!`, `How`). Punctuation that ends the sentence,
/// or that is not preceded by a letter, stays attached (`"you?"`, `"1."`).
pub fn tokenize(sentence: &str) -> Vec<&str> {
	let mut tokens = Vec::new();
	let mut rest = sentence.trim_start();

	while !rest.is_empty() {
		let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
		let word = &rest[..end];
		let followed_by_space = end < rest.len();

		match trailing_punctuation_split(word) {
			Some(split) if followed_by_space => {
				tokens.push(&word[..split]);
				tokens.push(&word[split..]);
			}
			_ => tokens.push(word),
		}

		rest = rest[end..].trim_start();
	}

	tokens
}

/// Byte offset where a letter-preceded trailing punctuation run starts.
fn trailing_punctuation_split(word: &str) -> Option<usize> {
	let split = word.trim_end_matches(|c: char| PUNCTUATION.contains(c)).len();
	if split == 0 || split == word.len() {
		return None;
	}
	word[..split]
		.chars()
		.next_back()
		.filter(char::is_ascii_alphabetic)
		.map(|_| split)
}

/// True if every character of the token is in `PUNCTUATION`.
pub fn is_punctuation(token: &str) -> bool {
	token.chars().all(|c| PUNCTUATION.contains(c))
}

/// Whether a space goes between two consecutive tokens.
///
/// Punctuation glues to whatever precedes it (`"foo."`, `"foo?!"`); after
/// punctuation, or between words, a space is inserted.
pub fn needs_space(_prev: &str, next: &str) -> bool {
	!is_punctuation(next)
}

/// Builds readable text from a token sequence.
pub fn reconstruct<S: AsRef<str>>(tokens: &[S]) -> String {
	let mut text = String::new();
	let mut last: Option<&str> = None;

	for token in tokens {
		let token = token.as_ref();
		if let Some(prev) = last {
			if needs_space(prev, token) {
				text.push(' ');
			}
		}
		text.push_str(token);
		last = Some(token);
	}

	text
}

/// Case-insensitive stopword lookup.
pub fn is_stopword(token: &str) -> bool {
	STOPWORDS.contains(token.to_lowercase().as_str())
}

/// Ranks interesting words across a token stream.
///
/// Stopwords are dropped first. For every remaining token, its leading
/// `[\w']+` run is scored: 1.0 per occurrence, tripled when it starts with an
/// uppercase letter, doubled when it is 15 characters or longer. Numbers and
/// runs of two characters or fewer are ignored. Scores are summed per exact
/// spelling and the top `MAX_KEYWORDS` are returned, best first.
pub fn rank_keywords<'a, I>(tokens: I) -> Vec<String>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut scores: HashMap<&str, f64> = HashMap::new();

	for token in tokens {
		if token.contains('@') || is_stopword(token) {
			continue;
		}

		let end = token
			.char_indices()
			.find(|&(_, c)| !(c.is_alphanumeric() || c == '_' || c == '\''))
			.map_or(token.len(), |(i, _)| i);
		let word = &token[..end];

		if word.chars().count() <= 2 || word.chars().all(|c| c.is_ascii_digit()) {
			continue;
		}

		let mut weight = 1.0;
		if word.chars().next().is_some_and(char::is_uppercase) {
			weight *= 3.0;
		}
		if word.chars().count() >= 15 {
			weight *= 2.0;
		}
		*scores.entry(word).or_insert(0.0) += weight;
	}

	let mut ranked: Vec<(&str, f64)> = scores.into_iter().collect();
	ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

	ranked
		.into_iter()
		.take(MAX_KEYWORDS)
		.map(|(word, _)| word.to_owned())
		.collect()
}

/// Detects unbalanced quotes, brackets and emphasis markers.
///
/// One of the most visible failure modes of suffix splicing; callers simply
/// retry when this returns true.
pub fn has_unmatched_enclosers(text: &str) -> bool {
	let tokens = tokenize(text);

	for (opener, closer) in ENCLOSERS.iter() {
		let mut opened: i64 = 0;

		for token in &tokens {
			if opener.is_match(token) {
				opened += 1;
			}
			if closer.is_match(token) {
				opened -= 1;
			}
			if opened < 0 {
				return true;
			}
		}

		if opened != 0 {
			return true;
		}
	}

	false
}

/// True if `needle` occurs as a contiguous run inside `haystack`.
pub fn is_contiguous_subsequence<T: PartialEq>(haystack: &[T], needle: &[T]) -> bool {
	if needle.is_empty() {
		return true;
	}
	haystack.windows(needle.len()).any(|window| window == needle)
}
