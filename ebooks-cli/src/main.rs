use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use ebooks_core::io::build_output_path;
use ebooks_core::model::SNAPSHOT_EXTENSION;
use ebooks_core::{EbooksResult, Model, SynthesisInput};

#[derive(Parser)]
#[command(version, about = "Build corpus models and synthesize short texts from them")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Ingest corpus files (.txt, .json, .csv) and save a model snapshot
	Consume {
		/// Corpus sources
		#[arg(required = true)]
		corpus: Vec<PathBuf>,

		/// Snapshot path (defaults to the first corpus with a .model extension)
		#[arg(short, long)]
		output: Option<PathBuf>,
	},
	/// Generate free-standing statements
	Statement {
		/// Snapshot, or corpus to build one from
		model: PathBuf,

		#[command(flatten)]
		generation: GenerationArgs,
	},
	/// Generate replies steered by an input text
	Response {
		/// Snapshot, or corpus to build one from
		model: PathBuf,

		/// Text to respond to
		input: String,

		#[command(flatten)]
		generation: GenerationArgs,
	},
	/// Generate statements with the Markov chain walk
	Chain {
		/// Snapshot, or corpus to build one from
		model: PathBuf,

		#[command(flatten)]
		generation: GenerationArgs,
	},
	/// Print the ranked corpus keywords
	Keywords {
		/// Snapshot, or corpus to build one from
		model: PathBuf,

		/// Number of keywords to print
		#[arg(long, default_value_t = 50)]
		top: usize,
	},
}

#[derive(Args)]
struct GenerationArgs {
	/// Number of outputs
	#[arg(short = 'n', long, default_value_t = 1)]
	count: usize,

	/// Character budget
	#[arg(long, default_value_t = ebooks_core::model::synthesis_input::DEFAULT_LIMIT)]
	limit: usize,

	/// Extra candidates tried before settling for the best one
	#[arg(long)]
	retry_limit: Option<usize>,

	/// Seed for reproducible output
	#[arg(long)]
	seed: Option<u64>,
}

impl GenerationArgs {
	fn synthesis_input(&self) -> EbooksResult<SynthesisInput> {
		let mut input = SynthesisInput::new(self.limit)?;
		if let Some(retry_limit) = self.retry_limit {
			input.retry_limit = retry_limit;
		}
		Ok(input)
	}

	fn rng(&self) -> StdRng {
		match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		}
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match Cli::parse().command {
		Command::Consume { corpus, output } => {
			let output = match output {
				Some(path) => path,
				None => build_output_path(&corpus[0], SNAPSHOT_EXTENSION)?,
			};
			let model = Model::ingest(&corpus)?;
			model.save(&output)?;
			info!(
				"{} tokens, {} statements, {} mentions",
				model.dictionary().len(),
				model.statements().len(),
				model.mentions().len()
			);
		}
		Command::Statement { model, generation } => {
			let model = Model::open(model)?;
			let input = generation.synthesis_input()?;
			let mut rng = generation.rng();
			for _ in 0..generation.count {
				println!("{}", model.make_statement(&input, &mut rng)?);
			}
		}
		Command::Response { model, input: text, generation } => {
			let model = Model::open(model)?;
			let input = generation.synthesis_input()?;
			let mut rng = generation.rng();
			for _ in 0..generation.count {
				println!("{}", model.make_response(&text, &input, &mut rng)?);
			}
		}
		Command::Chain { model, generation } => {
			let model = Model::open(model)?;
			let input = generation.synthesis_input()?;
			let mut rng = generation.rng();
			for _ in 0..generation.count {
				println!("{}", model.make_chain(&input, &mut rng)?);
			}
		}
		Command::Keywords { model, top } => {
			let model = Model::open(model)?;
			for keyword in model.keywords().iter().take(top) {
				println!("{keyword}");
			}
		}
	}

	Ok(())
}
