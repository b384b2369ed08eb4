use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub pipeline: Pipeline,
	pub stages: Stages,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Process-wide defaults handed to the controller at construction time.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
	/// Retrievers used when query understanding fails to pick any.
	pub default_retrievers: Vec<String>,
	#[serde(default = "default_model_name")]
	pub default_model_name: String,
	#[serde(default = "default_max_output_tokens")]
	pub default_max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stages {
	pub query_understanding: StageEndpoint,
	pub retrieval: StageEndpoint,
	pub synthesis: StageEndpoint,
}

/// A remotely deployed stage collaborator reached over HTTP JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct StageEndpoint {
	pub api_base: String,
	/// Optional. Sent as a bearer token when present.
	#[serde(default)]
	pub api_key: Option<String>,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_model_name() -> String {
	"llama-3.1-8b-instant".to_string()
}

fn default_max_output_tokens() -> u32 {
	1_024
}
