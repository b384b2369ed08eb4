use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Citation, QueryUnderstandingOutput, RetrievalOutput, SynthesisOutput};

/// Diagnostic snapshot of what query understanding decided, successful or substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryUnderstandingTrace {
	pub rewritten_query: String,
	pub intent: String,
	pub retrievers_to_use: Vec<String>,
}
impl From<&QueryUnderstandingOutput> for QueryUnderstandingTrace {
	fn from(output: &QueryUnderstandingOutput) -> Self {
		Self {
			rewritten_query: output.rewritten_query.clone(),
			intent: output.intent.clone(),
			retrievers_to_use: output.retrievers_to_use.clone(),
		}
	}
}

/// The unified response returned for every request, degraded or not.
///
/// Every field is always present on the wire; `raw_model_output` serializes as `null` when the
/// synthesizer produced none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
	pub answer: String,
	pub confidence: f32,
	pub warnings: Vec<String>,
	pub citations: Vec<Citation>,
	pub used_chunk_ids: Vec<String>,
	pub retrieval_trace: Map<String, Value>,
	pub query_understanding: QueryUnderstandingTrace,
	pub trace_id: String,
	pub latency_ms: u64,
	pub raw_model_output: Option<Value>,
	pub metrics: Map<String, Value>,
}
impl AnswerPayload {
	pub(crate) fn assemble(
		controller_warnings: Vec<String>,
		query_understanding: QueryUnderstandingTrace,
		retrieval: RetrievalOutput,
		synthesis: SynthesisOutput,
		latency_ms: u64,
	) -> Self {
		let SynthesisOutput {
			answer,
			citations,
			warnings: synthesis_warnings,
			confidence,
			raw_model_output,
			used_chunk_ids,
			reasoning: _,
			metrics,
		} = synthesis;
		let mut warnings = controller_warnings;

		warnings.extend(synthesis_warnings);

		Self {
			answer,
			confidence,
			warnings,
			citations,
			used_chunk_ids,
			retrieval_trace: retrieval.retrieval_trace,
			query_understanding,
			trace_id: retrieval.trace_id,
			latency_ms,
			raw_model_output,
			metrics,
		}
	}
}
