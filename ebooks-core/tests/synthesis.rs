use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use ebooks_core::model::{Model, SynthesisInput, SNAPSHOT_EXTENSION};
use ebooks_core::nlp::tokenize;

const ANIMALS: &[&str] = &[
	"the cat sat on the warm mat by the door",
	"the dog slept on the cold floor of the barn",
	"a bird sang on the high branch of the old tree",
	"the cat chased the small bird across the garden",
	"the dog barked at the old cat near the barn",
	"a fox watched the dog from the edge of the field",
	"the bird flew over the field and the old barn",
	"@farmer the fox ran across the garden at night",
	"@farmer the cat slept by the warm fire all night",
];

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
	let path = dir.join(name);
	fs::write(&path, contents).unwrap();
	path
}

#[test]
fn snapshot_round_trip_preserves_tables() {
	let dir = tempfile::tempdir().unwrap();
	let corpus = write(dir.path(), "animals.txt", &ANIMALS.join("\n"));

	let model = Model::ingest([&corpus]).unwrap();
	let snapshot = dir.path().join("animals.model");
	model.save(&snapshot).unwrap();
	let loaded = Model::load(&snapshot).unwrap();

	assert_eq!(loaded.dictionary(), model.dictionary());
	assert_eq!(loaded.statements(), model.statements());
	assert_eq!(loaded.mentions(), model.mentions());
	assert_eq!(loaded.keywords(), model.keywords());
	assert_eq!(loaded.name(), "animals");
	assert_eq!(loaded.mentions().len(), 2);
}

#[test]
fn ingests_all_three_formats() {
	let dir = tempfile::tempdir().unwrap();
	let plain = write(dir.path(), "plain.txt", "# header\nplain text line\n");
	let records = write(
		dir.path(),
		"archive.json",
		r#"[{"text": "record text here"}, {"text": "@pal record mention"}, {"id": 1}]"#,
	);
	let tabular = write(dir.path(), "rows.csv", "id,text\n1,tabular row text\n2,RT copied text\n");

	let model = Model::ingest([&plain, &records, &tabular]).unwrap();

	let statements: Vec<String> = model.statements().iter().map(|s| model.reconstruct(s)).collect();
	let mentions: Vec<String> = model.mentions().iter().map(|s| model.reconstruct(s)).collect();
	assert_eq!(statements, vec!["plain text line", "record text here", "tabular row text"]);
	assert_eq!(mentions, vec!["record mention"]);
	assert_eq!(model.name(), "plain");
}

#[test]
fn open_builds_then_reuses_snapshot() {
	let dir = tempfile::tempdir().unwrap();
	let corpus = write(dir.path(), "animals.txt", &ANIMALS.join("\n"));
	let snapshot = dir.path().join(format!("animals.{SNAPSHOT_EXTENSION}"));

	let built = Model::open(&corpus).unwrap();
	assert!(snapshot.exists());

	// The snapshot wins over the (now changed) source
	fs::write(&corpus, "something else entirely").unwrap();
	let reopened = Model::open(&corpus).unwrap();
	assert_eq!(reopened.statements(), built.statements());

	let direct = Model::open(&snapshot).unwrap();
	assert_eq!(direct.dictionary(), built.dictionary());
}

#[test]
fn missing_source_is_an_error() {
	let dir = tempfile::tempdir().unwrap();
	assert!(Model::ingest([dir.path().join("nope.txt")]).is_err());
}

#[test]
fn outputs_respect_the_limit() {
	let model = Model::from_lines(ANIMALS.iter().copied());
	let mut rng = StdRng::seed_from_u64(2024);

	for limit in [15, 30, 60, 140] {
		let input = SynthesisInput::new(limit).unwrap();
		for _ in 0..25 {
			let statement = model.make_statement(&input, &mut rng).unwrap();
			assert!(statement.chars().count() <= limit);

			let response = model.make_response("the old barn", &input, &mut rng).unwrap();
			assert!(response.chars().count() <= limit);
		}
	}
}

#[test]
fn verbatim_statements_are_rare() {
	let model = Model::from_lines(ANIMALS.iter().copied());
	let originals: HashSet<String> = model.sentences().map(|s| model.reconstruct(s)).collect();
	let input = SynthesisInput::new(280).unwrap();
	let mut rng = StdRng::seed_from_u64(7);

	let trials = 200;
	let verbatim = (0..trials)
		.map(|_| model.make_statement(&input, &mut rng).unwrap())
		.filter(|text| originals.contains(text))
		.count();

	assert!(verbatim * 20 < trials, "{verbatim} verbatim outputs out of {trials}");
}

#[test]
fn response_splices_only_relevant_sentences() {
	let lines = [
		"hi there my old friend",
		"well hi again sunshine",
		"oh hi you lovely person",
		"completely unrelated statement about taxes",
		"another sentence concerning weather patterns",
		"yet more text regarding tax law",
	];
	let model = Model::from_lines(lines);

	let allowed: HashSet<&str> = lines[..3].iter().flat_map(|line| tokenize(line)).collect();
	let input = SynthesisInput::default();

	for seed in 0..40 {
		let response = model.make_response("hi", &input, &mut StdRng::seed_from_u64(seed)).unwrap();
		for token in tokenize(&response) {
			assert!(allowed.contains(token), "{token:?} in {response:?} is not from a relevant sentence");
		}
	}
}

#[test]
fn response_without_overlap_falls_back_to_statement() {
	let model = Model::from_lines(ANIMALS.iter().copied());
	let input = SynthesisInput::default();

	let steered = model.make_response("quantum", &input, &mut StdRng::seed_from_u64(3)).unwrap();
	let unsteered = model.make_statement(&input, &mut StdRng::seed_from_u64(3)).unwrap();
	assert_eq!(steered, unsteered);
}

#[test]
fn seeded_generation_is_reproducible() {
	let model = Model::from_lines(ANIMALS.iter().copied());
	let input = SynthesisInput::default();

	let run = |seed| {
		let mut rng = StdRng::seed_from_u64(seed);
		(0..5)
			.map(|_| model.make_statement(&input, &mut rng).unwrap())
			.collect::<Vec<_>>()
	};
	assert_eq!(run(11), run(11));
}
