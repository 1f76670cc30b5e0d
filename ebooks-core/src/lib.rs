//! Corpus-driven short text synthesis.
//!
//! This crate turns a body of example text into new, non-verbatim short
//! statements:
//! - Normalization and ad hoc tokenization tuned for short informal text
//! - A tokenized corpus model split into statements and mentions
//! - Suffix-exchange generation with anti-verbatim guards
//! - Steered replies built from the sentences relevant to an input
//!
//! Randomness is always supplied by the caller, so seeded generators give
//! reproducible output.

/// Corpus model, generators and synthesis.
pub mod model;

/// Text normalization, segmentation, tokenization and heuristics.
pub mod nlp;

/// Corpus readers and path helpers.
pub mod io;

/// Error type shared by the crate.
pub mod error;

pub use error::{EbooksError, EbooksResult};
pub use model::{Model, SynthesisInput};
