use std::sync::Arc;

use relay_pipeline::{HttpStages, PipelineController, PipelineDefaults, Stages};

#[derive(Clone)]
pub struct AppState {
	pub controller: Arc<PipelineController>,
}
impl AppState {
	pub fn new(config: &relay_config::Config) -> Self {
		let stages = HttpStages::new(config.stages.clone()).into_stages();

		Self::with_stages(stages, PipelineDefaults::from(&config.pipeline))
	}

	pub fn with_stages(stages: Stages, defaults: PipelineDefaults) -> Self {
		Self { controller: Arc::new(PipelineController::new(stages, defaults)) }
	}
}
