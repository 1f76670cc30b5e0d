use std::path::PathBuf;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{get, middleware, put, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use ebooks_core::io::{list_files, normalize_folder};
use ebooks_core::model::SNAPSHOT_EXTENSION;
use ebooks_core::{EbooksError, EbooksResult, Model, SynthesisInput};

/// Extensions served from the data directory, in lookup order.
const SOURCE_EXTENSIONS: [&str; 4] = [SNAPSHOT_EXTENSION, "json", "csv", "txt"];

/// Largest `retry_limit` a request may ask for. Generation holds the model lock.
const MAX_RETRY_LIMIT: usize = 1000;

/// Command line / environment configuration.
#[derive(Parser, Debug)]
#[command(version, about = "HTTP front for the ebooks synthesizer")]
struct Args {
	/// Directory holding corpora and snapshots
	#[arg(long, env = "EBOOKS_DATA_DIR", default_value = "./data")]
	data_dir: String,

	/// Address to bind
	#[arg(long, env = "EBOOKS_HOST", default_value = "127.0.0.1")]
	host: String,

	/// Port to bind
	#[arg(long, env = "EBOOKS_PORT", default_value_t = 5000)]
	port: u16,

	/// Model to load at startup (name without extension)
	#[arg(long, env = "EBOOKS_MODEL")]
	model: Option<String>,
}

/// Query parameters for the `/v1/statement` and `/v1/chain` endpoints
#[derive(Deserialize)]
struct SynthesisParams {
	limit: Option<usize>,
	retry_limit: Option<usize>,
	seed: Option<u64>,
}

/// Query parameters for the `/v1/response` endpoint
#[derive(Deserialize)]
struct ResponseParams {
	input: Option<String>,
	limit: Option<usize>,
	retry_limit: Option<usize>,
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct KeywordsQuery {
	top: Option<usize>,
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>,
}

struct SharedData {
	data_dir: PathBuf,
	model: Option<Model>,
}

impl SharedData {
	/// Finds the source of a model name: its snapshot first, then a corpus.
	fn find_source(&self, name: &str) -> Option<PathBuf> {
		SOURCE_EXTENSIONS
			.iter()
			.map(|extension| self.data_dir.join(format!("{name}.{extension}")))
			.find(|path| path.is_file())
	}

	/// Opens `name` from the data directory and makes it the served model.
	fn load(&mut self, name: &str) -> EbooksResult<()> {
		let path = self
			.find_source(name)
			.ok_or_else(|| EbooksError::InvalidPath(format!("no model or corpus named {name}")))?;
		let model = Model::open(&path)?;
		info!(
			"Loaded model {} ({} statements, {} mentions)",
			model.name(),
			model.statements().len(),
			model.mentions().len()
		);
		self.model = Some(model);
		Ok(())
	}
}

/// Builds the synthesis parameters from optional query values.
fn synthesis_input(limit: Option<usize>, retry_limit: Option<usize>) -> EbooksResult<SynthesisInput> {
	let mut input = SynthesisInput::default();
	if let Some(limit) = limit {
		input.set_limit(limit)?;
	}
	if let Some(retry_limit) = retry_limit {
		if retry_limit > MAX_RETRY_LIMIT {
			return Err(EbooksError::InvalidParameter(format!(
				"retry_limit must be at most {MAX_RETRY_LIMIT}, got {retry_limit}"
			)));
		}
		input.retry_limit = retry_limit;
	}
	Ok(input)
}

/// Seeded generator when a seed is given, OS-seeded otherwise.
fn make_rng(seed: Option<u64>) -> StdRng {
	match seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	}
}

fn error_response(e: EbooksError) -> HttpResponse {
	match e {
		EbooksError::EmptyCorpus => HttpResponse::UnprocessableEntity().body(e.to_string()),
		EbooksError::InvalidParameter(_) => HttpResponse::BadRequest().body(e.to_string()),
		EbooksError::InvalidPath(_) => HttpResponse::NotFound().body(e.to_string()),
		_ => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/statement`
///
/// Generates a free-standing statement from the loaded model.
#[get("/v1/statement")]
async fn get_statement(data: web::Data<Mutex<SharedData>>, query: web::Query<SynthesisParams>) -> impl Responder {
	let input = match synthesis_input(query.limit, query.retry_limit) {
		Ok(input) => input,
		Err(e) => return error_response(e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model loaded");
	};

	match model.make_statement(&input, &mut make_rng(query.seed)) {
		Ok(result) => HttpResponse::Ok().body(result),
		Err(e) => error_response(e),
	}
}

/// HTTP GET endpoint `/v1/response`
///
/// Generates a reply steered by the `input` query parameter.
#[get("/v1/response")]
async fn get_response(data: web::Data<Mutex<SharedData>>, query: web::Query<ResponseParams>) -> impl Responder {
	let text = match &query.input {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty input"),
	};
	let input = match synthesis_input(query.limit, query.retry_limit) {
		Ok(input) => input,
		Err(e) => return error_response(e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model loaded");
	};

	match model.make_response(text, &input, &mut make_rng(query.seed)) {
		Ok(result) => HttpResponse::Ok().body(result),
		Err(e) => error_response(e),
	}
}

/// HTTP GET endpoint `/v1/chain`
///
/// Generates a statement with the Markov chain walk.
#[get("/v1/chain")]
async fn get_chain(data: web::Data<Mutex<SharedData>>, query: web::Query<SynthesisParams>) -> impl Responder {
	let input = match synthesis_input(query.limit, query.retry_limit) {
		Ok(input) => input,
		Err(e) => return error_response(e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model loaded");
	};

	match model.make_chain(&input, &mut make_rng(query.seed)) {
		Ok(result) => HttpResponse::Ok().body(result),
		Err(e) => error_response(e),
	}
}

#[get("/v1/keywords")]
async fn get_keywords(data: web::Data<Mutex<SharedData>>, query: web::Query<KeywordsQuery>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model loaded");
	};

	let top = query.top.unwrap_or(usize::MAX);
	let keywords: Vec<&str> = model.keywords().iter().take(top).map(String::as_str).collect();
	HttpResponse::Ok().body(keywords.join("\n"))
}

#[get("/v1/models")]
async fn get_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match list_files(&shared_data.data_dir, &SOURCE_EXTENSIONS) {
		Ok(files) => HttpResponse::Ok().body(files.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

#[get("/v1/loaded_model")]
async fn get_loaded_model(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match &shared_data.model {
		Some(model) => HttpResponse::Ok().body(model.name().to_owned()),
		None => HttpResponse::Conflict().body("No model loaded"),
	}
}

#[put("/v1/load_model")]
async fn put_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};
	if name.contains(['/', '\\']) || name.starts_with('.') {
		return HttpResponse::BadRequest().body("Invalid model name");
	}

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match shared_data.load(name) {
		Ok(()) => HttpResponse::Ok().body("Model loaded successfully"),
		Err(e) => {
			error!("Failed to load model {name}: {e}");
			error_response(e)
		}
	}
}

/// Main entry point for the server.
///
/// Wraps the served model in a `Mutex` (the core has no internal
/// synchronization) and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let mut shared_data = SharedData {
		data_dir: normalize_folder(&args.data_dir),
		model: None,
	};
	if let Some(name) = &args.model {
		if let Err(e) = shared_data.load(name) {
			error!("Failed to load startup model {name}: {e}");
		}
	}
	let shared_model = web::Data::new(Mutex::new(shared_data));

	info!("Listening on {}:{}", args.host, args.port);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.wrap(middleware::Logger::default())
			.app_data(shared_model.clone())
			.service(get_statement)
			.service(get_response)
			.service(get_chain)
			.service(get_keywords)
			.service(get_models)
			.service(get_loaded_model)
			.service(put_model)
	})
		.bind((args.host.as_str(), args.port))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test;

	const CORPUS: &str = "the cat sat on the warm mat by the door\n\
		the dog slept on the cold floor of the barn\n\
		a bird sang on the high branch of the old tree\n\
		the cat chased the small bird across the garden\n\
		@farmer the dog barked at the old cat near the barn\n";

	fn shared(data_dir: PathBuf) -> web::Data<Mutex<SharedData>> {
		web::Data::new(Mutex::new(SharedData { data_dir, model: None }))
	}

	#[actix_web::test]
	async fn generation_requires_a_loaded_model() {
		let app = test::init_service(
			App::new()
				.app_data(shared(PathBuf::from(".")))
				.service(get_statement)
				.service(get_loaded_model),
		)
		.await;

		let req = test::TestRequest::get().uri("/v1/statement").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

		let req = test::TestRequest::get().uri("/v1/loaded_model").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
	}

	#[actix_web::test]
	async fn load_then_generate() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("animals.txt"), CORPUS).unwrap();

		let app = test::init_service(
			App::new()
				.app_data(shared(dir.path().to_path_buf()))
				.service(put_model)
				.service(get_loaded_model)
				.service(get_models)
				.service(get_statement)
				.service(get_response),
		)
		.await;

		let req = test::TestRequest::put().uri("/v1/load_model?name=animals").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/loaded_model").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, "animals");

		// Loading wrote the snapshot next to the corpus
		let req = test::TestRequest::get().uri("/v1/models").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, "animals.model\nanimals.txt");

		let req = test::TestRequest::get().uri("/v1/statement?limit=40&seed=3").to_request();
		let first = test::call_and_read_body(&app, req).await;
		let req = test::TestRequest::get().uri("/v1/statement?limit=40&seed=3").to_request();
		let second = test::call_and_read_body(&app, req).await;
		assert_eq!(first, second);
		assert!(std::str::from_utf8(&first).unwrap().chars().count() <= 40);

		let req = test::TestRequest::get().uri("/v1/response?input=cat&seed=1").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
	}

	#[actix_web::test]
	async fn bad_requests_are_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new()
				.app_data(shared(dir.path().to_path_buf()))
				.service(put_model)
				.service(get_statement)
				.service(get_response),
		)
		.await;

		let req = test::TestRequest::put().uri("/v1/load_model?name=missing").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = test::TestRequest::put().uri("/v1/load_model?name=../etc").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get().uri("/v1/response").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get().uri("/v1/statement?retry_limit=1000000000").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn retry_limit_is_capped() {
		assert_eq!(synthesis_input(None, Some(MAX_RETRY_LIMIT)).unwrap().retry_limit, MAX_RETRY_LIMIT);
		assert!(matches!(
			synthesis_input(None, Some(MAX_RETRY_LIMIT + 1)),
			Err(EbooksError::InvalidParameter(_))
		));
		assert!(matches!(synthesis_input(Some(0), None), Err(EbooksError::InvalidParameter(_))));
	}
}
