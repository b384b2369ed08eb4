mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Pipeline, Security, Service, StageEndpoint, Stages};

use std::{fs, net::SocketAddr, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::Parse { source, .. } => Error::Parse { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes, and validates a config document that is already in memory.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::Parse { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let http_bind: SocketAddr = cfg.service.http_bind.parse().map_err(|_| Error::Validation {
		message: "service.http_bind must be a socket address such as 127.0.0.1:8080.".to_string(),
	})?;

	if cfg.security.bind_localhost_only && !http_bind.ip().is_loopback() {
		return Err(Error::Validation {
			message: "service.http_bind must be a loopback address when security.bind_localhost_only is true."
				.to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.pipeline.default_retrievers.is_empty() {
		return Err(Error::Validation {
			message: "pipeline.default_retrievers must contain at least one retriever.".to_string(),
		});
	}
	if cfg.pipeline.default_model_name.trim().is_empty() {
		return Err(Error::Validation {
			message: "pipeline.default_model_name must be non-empty.".to_string(),
		});
	}
	if cfg.pipeline.default_max_output_tokens == 0 {
		return Err(Error::Validation {
			message: "pipeline.default_max_output_tokens must be greater than zero.".to_string(),
		});
	}

	for (label, endpoint) in [
		("stages.query_understanding", &cfg.stages.query_understanding),
		("stages.retrieval", &cfg.stages.retrieval),
		("stages.synthesis", &cfg.stages.synthesis),
	] {
		validate_endpoint(label, endpoint)?;
	}

	Ok(())
}

fn validate_endpoint(label: &str, endpoint: &StageEndpoint) -> Result<()> {
	if !endpoint.api_base.starts_with("http://") && !endpoint.api_base.starts_with("https://") {
		return Err(Error::Validation {
			message: format!("{label}.api_base must start with http:// or https://."),
		});
	}
	if !endpoint.path.starts_with('/') {
		return Err(Error::Validation { message: format!("{label}.path must start with '/'.") });
	}
	if endpoint.timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("{label}.timeout_ms must be greater than zero."),
		});
	}
	if endpoint.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: format!("{label}.default_headers values must be strings."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.pipeline.default_retrievers = cfg
		.pipeline
		.default_retrievers
		.iter()
		.map(|retriever| retriever.trim())
		.filter(|retriever| !retriever.is_empty())
		.map(str::to_string)
		.collect();
	cfg.pipeline.default_model_name = cfg.pipeline.default_model_name.trim().to_string();

	for endpoint in [
		&mut cfg.stages.query_understanding,
		&mut cfg.stages.retrieval,
		&mut cfg.stages.synthesis,
	] {
		if endpoint.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			endpoint.api_key = None;
		}

		endpoint.api_base = endpoint.api_base.trim_end_matches('/').to_string();
	}
}
