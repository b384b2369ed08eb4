pub mod controller;
pub mod http;
pub mod payload;
pub mod schema;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

pub use controller::{PipelineController, PipelineDefaults};
pub use error::{Stage, StageFailure};
pub use http::HttpStages;
pub use payload::{AnswerPayload, QueryUnderstandingTrace};
pub use schema::{
	AnswerRequest, Citation, ConversationTurn, QueryUnderstandingInput, QueryUnderstandingOutput,
	RetrievalInput, RetrievalOutput, RetrievedChunk, SynthesisInput, SynthesisOutput,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Literal answer a synthesizer returns when retrieval gave it nothing to ground on.
pub const INSUFFICIENT_CONTEXT: &str = "INSUFFICIENT_CONTEXT";
pub const INSUFFICIENT_CONTEXT_ANSWER: &str = "I don't have enough information to answer that question right now. Try giving more context or allow retrieval of external sources.";
pub const INSUFFICIENT_CONTEXT_WARNING: &str =
	"Synthesizer reported INSUFFICIENT_CONTEXT. Returning fallback answer.";
pub const APOLOGY_ANSWER: &str = "Sorry, I couldn't generate a response right now.";
pub const UNKNOWN_INTENT: &str = "unknown";
/// Marks retrieval trace ids minted by the controller rather than the orchestrator.
pub const FALLBACK_TRACE_PREFIX: &str = "fallback-";

pub trait QueryUnderstander
where
	Self: Send + Sync,
{
	fn run<'a>(
		&'a self,
		input: &'a QueryUnderstandingInput,
	) -> BoxFuture<'a, color_eyre::Result<QueryUnderstandingOutput>>;
}

pub trait RetrievalOrchestrator
where
	Self: Send + Sync,
{
	fn run<'a>(
		&'a self,
		input: &'a RetrievalInput,
	) -> BoxFuture<'a, color_eyre::Result<RetrievalOutput>>;
}

pub trait ResponseSynthesizer
where
	Self: Send + Sync,
{
	fn run<'a>(
		&'a self,
		input: &'a SynthesisInput,
	) -> BoxFuture<'a, color_eyre::Result<SynthesisOutput>>;
}

#[derive(Clone)]
pub struct Stages {
	pub query_understander: Arc<dyn QueryUnderstander>,
	pub retrieval_orchestrator: Arc<dyn RetrievalOrchestrator>,
	pub response_synthesizer: Arc<dyn ResponseSynthesizer>,
}
impl Stages {
	pub fn new(
		query_understander: Arc<dyn QueryUnderstander>,
		retrieval_orchestrator: Arc<dyn RetrievalOrchestrator>,
		response_synthesizer: Arc<dyn ResponseSynthesizer>,
	) -> Self {
		Self { query_understander, retrieval_orchestrator, response_synthesizer }
	}
}
