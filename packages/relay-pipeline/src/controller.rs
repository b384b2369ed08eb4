use std::time::Instant;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::Instrument;

use crate::{
	AnswerPayload, AnswerRequest, INSUFFICIENT_CONTEXT, INSUFFICIENT_CONTEXT_ANSWER,
	INSUFFICIENT_CONTEXT_WARNING, QueryUnderstandingInput, QueryUnderstandingOutput,
	QueryUnderstandingTrace, RetrievalInput, RetrievalOutput, Stage, StageFailure, Stages,
	SynthesisInput, SynthesisOutput,
};

const MODEL_NAME_PREFERENCE: &str = "model_name";
const MAX_TOKENS_PREFERENCE: &str = "max_tokens";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefaults {
	pub retrievers: Vec<String>,
	pub model_name: String,
	pub max_output_tokens: u32,
}
impl From<&relay_config::Pipeline> for PipelineDefaults {
	fn from(cfg: &relay_config::Pipeline) -> Self {
		Self {
			retrievers: cfg.default_retrievers.clone(),
			model_name: cfg.default_model_name.clone(),
			max_output_tokens: cfg.default_max_output_tokens,
		}
	}
}

/// Drives query understanding, retrieval, and synthesis in sequence for one request at a time.
///
/// Holds only construction-time state, so a shared reference can serve concurrent requests.
/// Dropping a `run` future drops whichever stage call is in flight.
pub struct PipelineController {
	stages: Stages,
	defaults: PipelineDefaults,
}
impl PipelineController {
	pub fn new(stages: Stages, defaults: PipelineDefaults) -> Self {
		Self { stages, defaults }
	}

	pub fn defaults(&self) -> &PipelineDefaults {
		&self.defaults
	}

	/// Runs the pipeline. Stage failures degrade the payload and never escape.
	pub async fn run(&self, request: &AnswerRequest) -> AnswerPayload {
		let span = tracing::info_span!(
			"pipeline",
			request_id = %uuid::Uuid::new_v4(),
			user_id = %request.user_id,
			session_id = %request.session_id,
		);

		self.run_stages(request).instrument(span).await
	}

	async fn run_stages(&self, request: &AnswerRequest) -> AnswerPayload {
		let started = Instant::now();
		let mut warnings = Vec::new();
		let model_name = self.resolve_model_name(request);
		let understanding = self.understand(request, &mut warnings).await;
		let query_understanding = QueryUnderstandingTrace::from(&understanding);
		let retrieval = self.retrieve(request, &understanding, &mut warnings).await;
		let mut synthesis =
			self.synthesize(request, &understanding, &retrieval, model_name, &mut warnings).await;

		replace_insufficient_context(&mut synthesis, &mut warnings);

		let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

		tracing::info!(
			latency_ms,
			trace_id = %retrieval.trace_id,
			confidence = synthesis.confidence,
			degraded = !warnings.is_empty(),
			"Pipeline finished."
		);

		AnswerPayload::assemble(warnings, query_understanding, retrieval, synthesis, latency_ms)
	}

	async fn understand(
		&self,
		request: &AnswerRequest,
		warnings: &mut Vec<String>,
	) -> QueryUnderstandingOutput {
		let input = QueryUnderstandingInput::from_request(request, OffsetDateTime::now_utc());
		let result = self.stages.query_understander.run(&input).await;

		recover(Stage::QueryUnderstanding, result, warnings, |_| {
			QueryUnderstandingOutput::fallback(&request.query, &self.defaults.retrievers)
		})
	}

	async fn retrieve(
		&self,
		request: &AnswerRequest,
		understanding: &QueryUnderstandingOutput,
		warnings: &mut Vec<String>,
	) -> RetrievalOutput {
		let input = RetrievalInput::new(request, understanding);
		let result = self.stages.retrieval_orchestrator.run(&input).await;

		recover(Stage::Retrieval, result, warnings, |_| {
			RetrievalOutput::fallback(OffsetDateTime::now_utc())
		})
	}

	async fn synthesize(
		&self,
		request: &AnswerRequest,
		understanding: &QueryUnderstandingOutput,
		retrieval: &RetrievalOutput,
		model_name: String,
		warnings: &mut Vec<String>,
	) -> SynthesisOutput {
		let input = SynthesisInput {
			trace_id: retrieval.trace_id.clone(),
			user_id: request.user_id.clone(),
			session_id: request.session_id.clone(),
			query: understanding.rewritten_query.clone(),
			conversation_history: request.conversation_history.clone(),
			preferences: request.preferences.clone(),
			model_name,
			max_output_tokens: self.resolve_max_output_tokens(request),
			retrieved_chunks: retrieval.chunks.clone(),
		};
		let result = self.stages.response_synthesizer.run(&input).await;

		recover(Stage::Synthesis, result, warnings, |failure| {
			SynthesisOutput::fallback(&failure.message)
		})
	}

	fn resolve_model_name(&self, request: &AnswerRequest) -> String {
		[
			request.model_name.as_deref(),
			request.preferences.get(MODEL_NAME_PREFERENCE).and_then(Value::as_str),
		]
		.into_iter()
		.flatten()
		.map(str::trim)
		.find(|name| !name.is_empty())
		.unwrap_or(&self.defaults.model_name)
		.to_string()
	}

	fn resolve_max_output_tokens(&self, request: &AnswerRequest) -> u32 {
		let Some(value) = request.preferences.get(MAX_TOKENS_PREFERENCE) else {
			return self.defaults.max_output_tokens;
		};
		let parsed = match value {
			Value::Number(number) => number.as_u64(),
			Value::String(raw) => raw.trim().parse::<u64>().ok(),
			_ => None,
		};

		match parsed.filter(|tokens| *tokens > 0).and_then(|tokens| u32::try_from(tokens).ok()) {
			Some(tokens) => tokens,
			None => {
				tracing::debug!(%value, "Ignoring unusable max_tokens preference.");

				self.defaults.max_output_tokens
			},
		}
	}
}

/// Forwards a stage's success value, or records the failure and substitutes `fallback`.
fn recover<T>(
	stage: Stage,
	result: color_eyre::Result<T>,
	warnings: &mut Vec<String>,
	fallback: impl FnOnce(&StageFailure) -> T,
) -> T {
	match result {
		Ok(output) => output,
		Err(err) => {
			let failure = StageFailure::new(stage, &err);

			tracing::warn!(stage = %stage, error = %err, "Stage failed; substituting fallback.");

			let output = fallback(&failure);

			warnings.push(failure.to_string());

			output
		},
	}
}

fn replace_insufficient_context(synthesis: &mut SynthesisOutput, warnings: &mut Vec<String>) {
	if synthesis.answer.trim() != INSUFFICIENT_CONTEXT {
		return;
	}

	tracing::info!("Synthesizer lacked grounding; returning fallback answer.");

	warnings.push(INSUFFICIENT_CONTEXT_WARNING.to_string());

	synthesis.answer = INSUFFICIENT_CONTEXT_ANSWER.to_string();
	synthesis.confidence = 0.0;
}
