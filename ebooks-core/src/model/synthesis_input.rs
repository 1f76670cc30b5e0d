use crate::error::{EbooksError, EbooksResult};

/// Default character budget.
pub const DEFAULT_LIMIT: usize = 140;

/// Parameters of one synthesis request.
///
/// `SynthesisInput` bundles the character budget with the knobs of the
/// candidate loop. Plain knobs are public; the ones with a validity rule go
/// through setters.
///
/// # Invariants
/// - `limit >= 1`
/// - `passes >= 1`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisInput {
	/// Maximum length of the produced text, in characters.
	limit: usize,

	/// Number of extra candidates tried before settling for the best one.
	pub retry_limit: usize,

	/// Splice passes per generated candidate.
	passes: usize,

	/// Unsteered candidates must have more tokens than this; verbatim
	/// candidates at or below it are tolerated.
	pub min_tokens: usize,

	/// Relevant sentences needed to narrow a response generator.
	pub relevant_threshold: usize,

	/// Slightly relevant sentences needed when too few are relevant.
	pub slightly_relevant_threshold: usize,
}

impl Default for SynthesisInput {
	fn default() -> Self {
		Self {
			limit: DEFAULT_LIMIT,
			retry_limit: 100,
			passes: 3,
			min_tokens: 3,
			relevant_threshold: 3,
			slightly_relevant_threshold: 5,
		}
	}
}

impl SynthesisInput {
	/// Default parameters with the given character budget.
	///
	/// # Errors
	/// Returns an error if `limit` is zero.
	pub fn new(limit: usize) -> EbooksResult<Self> {
		let mut input = Self::default();
		input.set_limit(limit)?;
		Ok(input)
	}

	/// Returns the character budget.
	pub fn limit(&self) -> usize {
		self.limit
	}

	/// Sets the character budget.
	///
	/// # Errors
	/// Returns an error if `limit` is zero.
	pub fn set_limit(&mut self, limit: usize) -> EbooksResult<()> {
		if limit == 0 {
			return Err(EbooksError::InvalidParameter("limit must be >= 1".to_owned()));
		}
		self.limit = limit;
		Ok(())
	}

	/// Returns the number of splice passes per candidate.
	pub fn passes(&self) -> usize {
		self.passes
	}

	/// Sets the number of splice passes per candidate.
	///
	/// # Errors
	/// Returns an error if `passes` is zero.
	pub fn set_passes(&mut self, passes: usize) -> EbooksResult<()> {
		if passes == 0 {
			return Err(EbooksError::InvalidParameter("passes must be >= 1".to_owned()));
		}
		self.passes = passes;
		Ok(())
	}
}
