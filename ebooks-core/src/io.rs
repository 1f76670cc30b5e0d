use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use log::{debug, warn};
use serde_json::Value;

use crate::error::{EbooksError, EbooksResult};

/// Column or field holding the text of a structured/tabular corpus row.
pub const TEXT_FIELD: &str = "text";

/// Fallback field name used by some archive exports.
const FULL_TEXT_FIELD: &str = "full_text";

/// Layout of a corpus source, chosen from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorpusFormat {
	/// One entry per line.
	Plaintext,
	/// JSON array of records, each with a `text` field.
	Records,
	/// CSV with a header row naming a `text` column.
	Tabular,
}

impl CorpusFormat {
	/// `.json` → records, `.csv` → tabular, anything else → plaintext.
	pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
		let extension = path
			.as_ref()
			.extension()
			.map(|e| e.to_string_lossy().to_ascii_lowercase());

		match extension.as_deref() {
			Some("json") => CorpusFormat::Records,
			Some("csv") => CorpusFormat::Tabular,
			_ => CorpusFormat::Plaintext,
		}
	}
}

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Lines that are not valid UTF-8 are skipped with a warning
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let filename = filename.as_ref();
	let mut contents = Vec::new();
	File::open(filename)?.read_to_end(&mut contents)?;

	let mut lines = Vec::new();
	if contents.is_empty() {
		return Ok(lines);
	}

	// A trailing newline does not start another line
	let body = contents.strip_suffix(b"\n").unwrap_or(&contents);
	for (i, line) in body.split(|&b| b == b'\n').enumerate() {
		let line = line.strip_suffix(b"\r").unwrap_or(line);
		match std::str::from_utf8(line) {
			Ok(line) => lines.push(line.to_owned()),
			Err(e) => warn!("{}: line {} is not valid UTF-8, skipped: {e}", filename.display(), i + 1),
		}
	}

	Ok(lines)
}

/// Reads the text rows of a corpus source, whatever its format.
///
/// Rows that cannot be used (lines that are not UTF-8, records without text,
/// CSV rows that fail to parse) are skipped. Only an unreadable file or an unparseable top level
/// is an error.
pub fn read_corpus<P: AsRef<Path>>(path: P) -> EbooksResult<Vec<String>> {
	let path = path.as_ref();
	match CorpusFormat::from_path(path) {
		CorpusFormat::Plaintext => Ok(read_file(path)?),
		CorpusFormat::Records => read_records(path),
		CorpusFormat::Tabular => read_tabular(path),
	}
}

fn read_records(path: &Path) -> EbooksResult<Vec<String>> {
	let bytes = fs::read(path)?;
	let records: Vec<Value> = serde_json::from_slice(&bytes)?;

	let mut rows = Vec::with_capacity(records.len());
	for (i, record) in records.iter().enumerate() {
		let text = record
			.get(TEXT_FIELD)
			.or_else(|| record.get(FULL_TEXT_FIELD))
			.and_then(Value::as_str);

		match text {
			Some(text) => rows.push(text.to_owned()),
			None => debug!("{}: record {i} has no text, skipped", path.display()),
		}
	}

	Ok(rows)
}

fn read_tabular(path: &Path) -> EbooksResult<Vec<String>> {
	let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

	let column = reader
		.headers()?
		.iter()
		.position(|header| header.trim().eq_ignore_ascii_case(TEXT_FIELD))
		.ok_or_else(|| EbooksError::MissingColumn(TEXT_FIELD.to_owned()))?;

	let mut rows = Vec::new();
	for (i, record) in reader.records().enumerate() {
		match record {
			Ok(record) => match record.get(column) {
				Some(text) => rows.push(text.to_owned()),
				None => debug!("{}: row {i} is too short, skipped", path.display()),
			},
			Err(e) => warn!("{}: malformed row {i} skipped: {e}", path.display()),
		}
	}

	Ok(rows)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `corpus/someone.json` + `"model"` → `corpus/someone.model`
pub fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./corpus/someone.model"` → `"someone"`
/// - `"someone.txt"` → `"someone"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists all files with one of the given extensions in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if !path.is_file() {
			continue;
		}

		let matches = path
			.extension()
			.is_some_and(|e| extensions.iter().any(|wanted| e == *wanted));
		if matches {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_follows_extension() {
		assert_eq!(CorpusFormat::from_path("a/b.json"), CorpusFormat::Records);
		assert_eq!(CorpusFormat::from_path("b.CSV"), CorpusFormat::Tabular);
		assert_eq!(CorpusFormat::from_path("b.txt"), CorpusFormat::Plaintext);
		assert_eq!(CorpusFormat::from_path("tweets"), CorpusFormat::Plaintext);
	}

	#[test]
	fn output_path_swaps_extension() {
		let path = build_output_path("corpus/someone.json", "model").unwrap();
		assert_eq!(path, PathBuf::from("corpus/someone.model"));
		assert_eq!(get_filename(&path).unwrap(), "someone");
	}

	#[test]
	fn plaintext_skips_lines_with_invalid_utf8() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		let mut bytes = b"a good line here\r\n".to_vec();
		bytes.extend_from_slice(b"bad \xff\xfe line\n");
		bytes.extend_from_slice(b"another good line\n");
		fs::write(&path, bytes).unwrap();

		assert_eq!(read_corpus(&path).unwrap(), vec!["a good line here", "another good line"]);
	}

	#[test]
	fn plaintext_keeps_last_line_without_newline() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "first\n\nlast").unwrap();

		assert_eq!(read_corpus(&path).unwrap(), vec!["first", "", "last"]);
	}

	#[test]
	fn records_skip_entries_without_text() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("archive.json");
		fs::write(
			&path,
			r#"[{"text": "first"}, {"id": 3}, "junk", {"full_text": "second"}]"#,
		)
		.unwrap();

		assert_eq!(read_corpus(&path).unwrap(), vec!["first", "second"]);
	}

	#[test]
	fn tabular_reads_text_column() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tweets.csv");
		fs::write(&path, "id,Text,source\n1,\"hello, there\",web\n2\n3,again,app\n").unwrap();

		assert_eq!(read_corpus(&path).unwrap(), vec!["hello, there", "again"]);
	}

	#[test]
	fn tabular_without_text_column_fails() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bad.csv");
		fs::write(&path, "id,body\n1,hello\n").unwrap();

		assert!(matches!(read_corpus(&path), Err(EbooksError::MissingColumn(_))));
	}

	#[test]
	fn list_files_filters_by_extension() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["b.model", "a.txt", "c.bin"] {
			fs::write(dir.path().join(name), "").unwrap();
		}

		let files = list_files(dir.path(), &["model", "txt"]).unwrap();
		assert_eq!(files, vec!["a.txt", "b.model"]);
	}
}
