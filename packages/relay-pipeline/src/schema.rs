//! Request-scoped records exchanged between the controller and its stage collaborators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{APOLOGY_ANSWER, FALLBACK_TRACE_PREFIX, UNKNOWN_INTENT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
	pub role: String,
	pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
	pub query: String,
	pub user_id: String,
	pub session_id: String,
	#[serde(default)]
	pub preferences: Map<String, Value>,
	#[serde(default)]
	pub conversation_history: Vec<ConversationTurn>,
	#[serde(default)]
	pub allow_agentic: bool,
	#[serde(default)]
	pub model_name: Option<String>,
}
impl AnswerRequest {
	pub fn new(
		query: impl Into<String>,
		user_id: impl Into<String>,
		session_id: impl Into<String>,
	) -> Self {
		Self {
			query: query.into(),
			user_id: user_id.into(),
			session_id: session_id.into(),
			preferences: Map::new(),
			conversation_history: Vec::new(),
			allow_agentic: false,
			model_name: None,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUnderstandingInput {
	pub query: String,
	pub user_id: String,
	pub session_id: String,
	pub preferences: Map<String, Value>,
	pub conversation_history: Vec<ConversationTurn>,
	#[serde(with = "rfc3339")]
	pub timestamp: OffsetDateTime,
}
impl QueryUnderstandingInput {
	pub fn from_request(request: &AnswerRequest, timestamp: OffsetDateTime) -> Self {
		Self {
			query: request.query.clone(),
			user_id: request.user_id.clone(),
			session_id: request.session_id.clone(),
			preferences: request.preferences.clone(),
			conversation_history: request.conversation_history.clone(),
			timestamp,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryUnderstandingOutput {
	pub intent: String,
	pub rewritten_query: String,
	pub retrievers_to_use: Vec<String>,
	#[serde(default)]
	pub retrieval_params: Map<String, Value>,
	#[serde(default)]
	pub style_preferences: Map<String, Value>,
}
impl QueryUnderstandingOutput {
	/// Passes the original query through untouched and routes to the default retrievers.
	pub fn fallback(query: &str, default_retrievers: &[String]) -> Self {
		Self {
			intent: UNKNOWN_INTENT.to_string(),
			rewritten_query: query.to_string(),
			retrievers_to_use: default_retrievers.to_vec(),
			retrieval_params: Map::new(),
			style_preferences: Map::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalInput {
	pub user_id: String,
	pub session_id: String,
	pub rewritten_query: String,
	pub retrievers_to_use: Vec<String>,
	pub retrieval_params: Map<String, Value>,
	pub conversation_history: Vec<ConversationTurn>,
	pub preferences: Map<String, Value>,
	/// Whether the orchestrator may run agentic (multi-step, tool-using) retrievers.
	pub allow_agentic: bool,
}
impl RetrievalInput {
	pub fn new(request: &AnswerRequest, understanding: &QueryUnderstandingOutput) -> Self {
		Self {
			user_id: request.user_id.clone(),
			session_id: request.session_id.clone(),
			rewritten_query: understanding.rewritten_query.clone(),
			retrievers_to_use: understanding.retrievers_to_use.clone(),
			retrieval_params: understanding.retrieval_params.clone(),
			conversation_history: request.conversation_history.clone(),
			preferences: request.preferences.clone(),
			allow_agentic: request.allow_agentic,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
	#[serde(default)]
	pub chunk_id: Option<String>,
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutput {
	pub chunks: Vec<RetrievedChunk>,
	#[serde(default)]
	pub retrieval_trace: Map<String, Value>,
	pub trace_id: String,
}
impl RetrievalOutput {
	/// An empty result carrying a freshly minted, recognizably synthetic trace id.
	pub fn fallback(now: OffsetDateTime) -> Self {
		let millis = now.unix_timestamp_nanos() / 1_000_000;

		Self {
			chunks: Vec::new(),
			retrieval_trace: Map::new(),
			trace_id: format!("{FALLBACK_TRACE_PREFIX}{millis}-{}", Uuid::new_v4().simple()),
		}
	}

	pub fn is_fallback(&self) -> bool {
		self.trace_id.starts_with(FALLBACK_TRACE_PREFIX)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisInput {
	pub trace_id: String,
	pub user_id: String,
	pub session_id: String,
	pub query: String,
	pub conversation_history: Vec<ConversationTurn>,
	pub preferences: Map<String, Value>,
	pub model_name: String,
	pub max_output_tokens: u32,
	pub retrieved_chunks: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
	pub chunk_id: String,
	/// Source-specific fields (title, url, page, ...), passed through untouched.
	#[serde(flatten)]
	pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
	pub answer: String,
	#[serde(default)]
	pub citations: Vec<Citation>,
	#[serde(default)]
	pub warnings: Vec<String>,
	pub confidence: f32,
	#[serde(default)]
	pub raw_model_output: Option<Value>,
	#[serde(default)]
	pub used_chunk_ids: Vec<String>,
	#[serde(default)]
	pub reasoning: Option<String>,
	#[serde(default)]
	pub metrics: Map<String, Value>,
}
impl SynthesisOutput {
	pub fn fallback(error: &str) -> Self {
		Self {
			answer: APOLOGY_ANSWER.to_string(),
			citations: Vec::new(),
			warnings: vec![error.to_string()],
			confidence: 0.0,
			raw_model_output: None,
			used_chunk_ids: Vec::new(),
			reasoning: None,
			metrics: Map::new(),
		}
	}
}

mod rfc3339 {
	use serde::{Deserialize, Deserializer, Serializer};
	use time::{OffsetDateTime, format_description::well_known::Rfc3339};

	pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

		serializer.serialize_str(&formatted)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn query_understanding_fallback_keeps_original_query() {
		let defaults = vec!["vector".to_string(), "keyword".to_string()];
		let output = QueryUnderstandingOutput::fallback("how do refunds work?", &defaults);

		assert_eq!(output.intent, "unknown");
		assert_eq!(output.rewritten_query, "how do refunds work?");
		assert_eq!(output.retrievers_to_use, defaults);
		assert!(output.retrieval_params.is_empty());
		assert!(output.style_preferences.is_empty());
	}

	#[test]
	fn retrieval_fallback_trace_ids_are_marked_and_unique() {
		let now = datetime!(2026-01-02 03:04:05.678 UTC);
		let first = RetrievalOutput::fallback(now);
		let second = RetrievalOutput::fallback(now);

		assert!(first.chunks.is_empty());
		assert!(first.retrieval_trace.is_empty());
		assert!(first.is_fallback());
		assert!(first.trace_id.starts_with("fallback-1767323045678-"));
		assert_ne!(first.trace_id, second.trace_id);
	}

	#[test]
	fn synthesis_fallback_is_an_apology() {
		let output = SynthesisOutput::fallback("upstream 503");

		assert_eq!(output.answer, APOLOGY_ANSWER);
		assert_eq!(output.warnings, vec!["upstream 503".to_string()]);
		assert_eq!(output.confidence, 0.0);
		assert!(output.citations.is_empty());
		assert!(output.used_chunk_ids.is_empty());
		assert!(output.raw_model_output.is_none());
		assert!(output.reasoning.is_none());
		assert!(output.metrics.is_empty());
	}

	#[test]
	fn timestamp_is_rfc3339_on_the_wire() {
		let request = AnswerRequest::new("q", "u1", "s1");
		let input =
			QueryUnderstandingInput::from_request(&request, datetime!(2026-01-02 03:04:05 UTC));
		let json = serde_json::to_value(&input).expect("serialize failed");

		assert_eq!(json["timestamp"], "2026-01-02T03:04:05Z");
	}

	#[test]
	fn synthesis_output_tolerates_sparse_bodies() {
		let output: SynthesisOutput = serde_json::from_value(serde_json::json!({
			"answer": "Refunds take five days.",
			"confidence": 0.7,
			"citations": [{ "chunk_id": "c1", "title": "Refund policy" }]
		}))
		.expect("deserialize failed");

		assert_eq!(output.citations[0].chunk_id, "c1");
		assert_eq!(output.citations[0].attributes["title"], "Refund policy");
		assert!(output.warnings.is_empty());
		assert!(output.metrics.is_empty());
	}
}
