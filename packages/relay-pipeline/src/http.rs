use std::sync::Arc;

use crate::{
	BoxFuture, QueryUnderstander, QueryUnderstandingInput, QueryUnderstandingOutput,
	ResponseSynthesizer, RetrievalInput, RetrievalOrchestrator, RetrievalOutput, Stages,
	SynthesisInput, SynthesisOutput,
};

/// Stage collaborators deployed as HTTP JSON services, one endpoint per stage.
pub struct HttpStages {
	endpoints: relay_config::Stages,
}
impl HttpStages {
	pub fn new(endpoints: relay_config::Stages) -> Self {
		Self { endpoints }
	}

	pub fn into_stages(self) -> Stages {
		let shared = Arc::new(self);

		Stages::new(shared.clone(), shared.clone(), shared)
	}
}

impl QueryUnderstander for HttpStages {
	fn run<'a>(
		&'a self,
		input: &'a QueryUnderstandingInput,
	) -> BoxFuture<'a, color_eyre::Result<QueryUnderstandingOutput>> {
		Box::pin(async move {
			Ok(relay_providers::invoke(&self.endpoints.query_understanding, input).await?)
		})
	}
}

impl RetrievalOrchestrator for HttpStages {
	fn run<'a>(
		&'a self,
		input: &'a RetrievalInput,
	) -> BoxFuture<'a, color_eyre::Result<RetrievalOutput>> {
		Box::pin(async move { Ok(relay_providers::invoke(&self.endpoints.retrieval, input).await?) })
	}
}

impl ResponseSynthesizer for HttpStages {
	fn run<'a>(
		&'a self,
		input: &'a SynthesisInput,
	) -> BoxFuture<'a, color_eyre::Result<SynthesisOutput>> {
		Box::pin(async move { Ok(relay_providers::invoke(&self.endpoints.synthesis, input).await?) })
	}
}
