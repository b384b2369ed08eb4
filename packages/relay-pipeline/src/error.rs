use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	QueryUnderstanding,
	Retrieval,
	Synthesis,
}
impl Stage {
	pub fn label(self) -> &'static str {
		match self {
			Self::QueryUnderstanding => "QueryUnderstanding",
			Self::Retrieval => "Retrieval",
			Self::Synthesis => "Synthesizer",
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// A collaborator error, recovered by the controller and surfaced as a payload warning.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct StageFailure {
	pub stage: Stage,
	pub message: String,
}
impl StageFailure {
	pub fn new(stage: Stage, err: &color_eyre::Report) -> Self {
		Self { stage, message: err.to_string() }
	}
}
