use thiserror::Error;

/// Errors surfaced by the ebooks core.
///
/// Generation itself recovers locally (retry loop, early stop), so the only
/// generation-time variant is `EmptyCorpus`. Everything else comes from the
/// ingestion and snapshot boundaries.
#[derive(Error, Debug)]
pub enum EbooksError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),

	#[error("JSON corpus error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("CSV corpus error: {0}")]
	Csv(#[from] csv::Error),

	#[error("Tabular corpus has no `{0}` column")]
	MissingColumn(String),

	#[error("Invalid path: {0}")]
	InvalidPath(String),

	#[error("Invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("Corpus has no sentence with at least two tokens")]
	EmptyCorpus,
}

pub type EbooksResult<T> = Result<T, EbooksError>;
