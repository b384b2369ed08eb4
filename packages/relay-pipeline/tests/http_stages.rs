use std::net::SocketAddr;

use axum::{Json, Router, http::StatusCode, routing::post};
use serde_json::{Map, Value};
use tokio::net::TcpListener;

use relay_config::{StageEndpoint, Stages as StageEndpoints};
use relay_pipeline::{AnswerRequest, HttpStages, PipelineController, PipelineDefaults};

async fn understand(Json(input): Json<Value>) -> Json<Value> {
	let query = input["query"].as_str().unwrap_or_default().to_string();

	Json(serde_json::json!({
		"intent": "faq",
		"rewritten_query": format!("{query} (rewritten)"),
		"retrievers_to_use": ["faq_index"],
	}))
}

async fn retrieve(Json(input): Json<Value>) -> Json<Value> {
	Json(serde_json::json!({
		"output": {
			"chunks": [{ "chunk_id": "faq-1", "content": input["rewritten_query"] }],
			"retrieval_trace": { "retrievers": input["retrievers_to_use"] },
			"trace_id": "remote-trace",
		}
	}))
}

async fn synthesize(Json(input): Json<Value>) -> Json<Value> {
	let chunk_count = input["retrieved_chunks"].as_array().map(Vec::len).unwrap_or(0);

	Json(serde_json::json!({
		"answer": format!("Answer from {chunk_count} chunk(s)."),
		"citations": [{ "chunk_id": "faq-1" }],
		"confidence": 0.6,
		"used_chunk_ids": ["faq-1"],
		"metrics": { "model": input["model_name"] },
	}))
}

async fn unavailable() -> StatusCode {
	StatusCode::SERVICE_UNAVAILABLE
}

async fn spawn_stage_server() -> SocketAddr {
	let app = Router::new()
		.route("/understand", post(understand))
		.route("/retrieve", post(retrieve))
		.route("/synthesize", post(synthesize))
		.route("/unavailable", post(unavailable));
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test server.");
	let addr = listener.local_addr().expect("Failed to read test server address.");

	tokio::spawn(async move {
		axum::serve(listener, app).await.expect("Test server failed.");
	});

	addr
}

fn endpoint(addr: SocketAddr, path: &str) -> StageEndpoint {
	StageEndpoint {
		api_base: format!("http://{addr}"),
		api_key: None,
		path: path.to_string(),
		timeout_ms: 2_000,
		default_headers: Map::new(),
	}
}

fn defaults() -> PipelineDefaults {
	PipelineDefaults {
		retrievers: vec!["vector".to_string()],
		model_name: "default-model".to_string(),
		max_output_tokens: 256,
	}
}

#[tokio::test]
async fn drives_remote_stages_end_to_end() {
	let addr = spawn_stage_server().await;
	let stages = HttpStages::new(StageEndpoints {
		query_understanding: endpoint(addr, "/understand"),
		retrieval: endpoint(addr, "/retrieve"),
		synthesis: endpoint(addr, "/synthesize"),
	});
	let pipeline = PipelineController::new(stages.into_stages(), defaults());
	let payload = pipeline.run(&AnswerRequest::new("opening hours", "u-1", "s-1")).await;

	assert!(payload.warnings.is_empty(), "warnings: {:?}", payload.warnings);
	assert_eq!(payload.answer, "Answer from 1 chunk(s).");
	assert_eq!(payload.trace_id, "remote-trace");
	assert_eq!(payload.query_understanding.rewritten_query, "opening hours (rewritten)");
	assert_eq!(payload.retrieval_trace["retrievers"], serde_json::json!(["faq_index"]));
	assert_eq!(payload.metrics["model"], "default-model");
	assert_eq!(payload.used_chunk_ids, vec!["faq-1".to_string()]);
}

#[tokio::test]
async fn unavailable_remote_stage_degrades_to_fallback() {
	let addr = spawn_stage_server().await;
	let stages = HttpStages::new(StageEndpoints {
		query_understanding: endpoint(addr, "/understand"),
		retrieval: endpoint(addr, "/unavailable"),
		synthesis: endpoint(addr, "/synthesize"),
	});
	let pipeline = PipelineController::new(stages.into_stages(), defaults());
	let payload = pipeline.run(&AnswerRequest::new("opening hours", "u-1", "s-1")).await;

	assert_eq!(payload.warnings.len(), 1);
	assert!(payload.warnings[0].starts_with("Retrieval failed: "), "{:?}", payload.warnings);
	assert!(payload.trace_id.starts_with("fallback-"));
	assert_eq!(payload.answer, "Answer from 0 chunk(s).");
}
