use std::env;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use rs_reply_core::{CountStore, ReplyConfig, ReplyError, ReplyOrchestrator, TaggedTextAnalyzer};

/// Wall-clock budget of a reply when the configuration sets none.
const DEFAULT_DEADLINE_MS: u64 = 2000;

/// Query parameters of the `/v1/reply` endpoint.
#[derive(Deserialize)]
struct ReplyParams {
	text: String,
	num: Option<usize>,
	mode: Option<String>,
	maxlen: Option<usize>,
	width: Option<usize>,
	seed: Option<u64>,
}

/// Query parameters of the `/v1/heads` endpoint.
#[derive(Deserialize)]
struct HeadParams {
	text: String,
	num: Option<usize>,
}

/// Read-only state shared by every worker.
struct SharedData {
	store: CountStore,
	config: ReplyConfig,
	analyzer: TaggedTextAnalyzer,
}

impl ReplyParams {
	/// Applies the per-request overrides on top of the server configuration.
	fn config(&self, base: &ReplyConfig) -> Result<ReplyConfig, ReplyError> {
		let mut config = base.clone();
		if let Some(num) = self.num {
			config.set_num_heads(num)?;
		}
		if let Some(mode) = &self.mode {
			config.set_mode(mode)?;
		}
		if let Some(maxlen) = self.maxlen {
			config.set_maxlen(maxlen)?;
		}
		if let Some(width) = self.width {
			config.set_first_sample_width(width)?;
		}
		Ok(config)
	}

	fn rng(&self) -> StdRng {
		match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_rng(&mut rand::rng()),
		}
	}
}

/// HTTP GET endpoint `/v1/reply`
///
/// Generates replies to `text` (tagged as `surface/POS`), one per line.
/// An empty body means no head was found for the input.
#[get("/v1/reply")]
async fn get_reply(data: web::Data<SharedData>, query: web::Query<ReplyParams>) -> impl Responder {
	let config = match query.config(&data.config) {
		Ok(config) => config,
		Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
	};

	let query = query.into_inner();
	let result = web::block(move || {
		let orchestrator = ReplyOrchestrator::from_store(&data.store, config)?;
		let replies = orchestrator.reply(&data.analyzer, &query.text, &mut query.rng());
		Ok::<_, ReplyError>(replies.into_iter().map(|reply| reply.text).collect::<Vec<_>>())
	})
	.await;

	match result {
		Ok(Ok(texts)) => HttpResponse::Ok().body(texts.join("\n")),
		Ok(Err(e)) => HttpResponse::BadRequest().body(e.to_string()),
		Err(e) => {
			error!("reply worker failed: {e}");
			HttpResponse::InternalServerError().body("Generation failed")
		}
	}
}

/// HTTP GET endpoint `/v1/heads`
///
/// Lists the ranked heads of `text` as `head \t score` lines.
#[get("/v1/heads")]
async fn get_heads(data: web::Data<SharedData>, query: web::Query<HeadParams>) -> impl Responder {
	let orchestrator = match ReplyOrchestrator::from_store(&data.store, data.config.clone()) {
		Ok(orchestrator) => orchestrator,
		Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
	};

	let features = orchestrator.features(&data.analyzer, &query.text);
	let limit = query.num.unwrap_or(data.config.num_heads);
	let lines: Vec<String> = orchestrator
		.heads(&features, limit)
		.into_iter()
		.map(|(head, score)| format!("{head}\t{score}"))
		.collect();

	HttpResponse::Ok().body(lines.join("\n"))
}

/// HTTP GET endpoint `/v1/config`, the active configuration as JSON.
#[get("/v1/config")]
async fn get_config(data: web::Data<SharedData>) -> impl Responder {
	HttpResponse::Ok().json(&data.config)
}

/// Gives `config` the default deadline if it has none.
fn with_deadline(mut config: ReplyConfig) -> ReplyConfig {
	config.deadline_ms.get_or_insert(DEFAULT_DEADLINE_MS);
	config
}

fn load(data_dir: &str, config_path: Option<&str>) -> Result<SharedData, ReplyError> {
	let config = match config_path {
		Some(path) => ReplyConfig::from_file(path)?,
		None => ReplyConfig::default(),
	};
	let config = with_deadline(config);
	let store = CountStore::open(data_dir)?;
	Ok(SharedData { store, config, analyzer: TaggedTextAnalyzer })
}

/// Main entry point for the server.
///
/// Usage: `rs-reply-server [data_dir] [config.json]`
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - The store is loaded once and shared read-only, no lock is needed.
/// - `RUST_LOG` controls log verbosity.
/// - Replies stop after `DEFAULT_DEADLINE_MS` unless the configuration sets
///   `deadline_ms`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let args: Vec<String> = env::args().collect();
	let data_dir = args.get(1).map(String::as_str).unwrap_or("./data");
	let config_path = args.get(2).map(String::as_str);

	let shared_data = match load(data_dir, config_path) {
		Ok(shared_data) => web::Data::new(shared_data),
		Err(e) => {
			error!("cannot start: {e}");
			return Err(std::io::Error::other(e));
		}
	};
	info!("serving replies from {data_dir} on 127.0.0.1:5000");

	HttpServer::new(move || {
		App::new()
			.app_data(shared_data.clone())
			.service(get_reply)
			.service(get_heads)
			.service(get_config)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
