//! Corpus model and text synthesis.
//!
//! This module provides the statistical side of the crate:
//! - Token interning (`Dictionary`)
//! - Corpus ingestion, register partition and snapshots (`Model`)
//! - Suffix-exchange recombination (`SuffixGenerator`)
//! - Steering-input narrowing (`find_relevant`)
//! - Candidate loops and register fallback (`Model::make_statement`, `Model::make_response`)
//! - A plain Markov chain walk (`MarkovChain`)

/// Append-only token dictionary.
///
/// Maps token strings to stable integer handles (tikis) and back.
pub mod dictionary;

/// Corpus model: dictionary, statement/mention tables and keywords.
///
/// Handles ingestion from plaintext, JSON records and CSV rows,
/// and postcard snapshots.
pub mod corpus_model;

/// Unigram/bigram adjacency indexes and suffix-exchange generation.
pub mod suffix_generator;

/// Relevant / slightly relevant sentence selection for steered replies.
pub mod relevance;

/// Parameters of a synthesis request (limit, retries, thresholds).
pub mod synthesis_input;

/// Statement and response synthesis on top of `Model`.
///
/// Only adds methods to `Model`; nothing to export.
mod synthesizer;

/// Token-by-token Markov chain generation.
pub mod markov;

pub use corpus_model::{Model, Register, SNAPSHOT_EXTENSION};
pub use dictionary::{Dictionary, Tiki};
pub use suffix_generator::{Mode, SuffixGenerator};
pub use synthesis_input::SynthesisInput;
