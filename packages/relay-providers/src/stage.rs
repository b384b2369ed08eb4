use std::time::Duration;

use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use relay_config::StageEndpoint;

use crate::{Error, Result};

/// Posts `input` as JSON to the endpoint and decodes the stage output.
///
/// The body may be the output itself or an `{"output": ...}` envelope. An `{"error": "..."}`
/// body is reported as [`Error::Remote`].
pub async fn invoke<I, O>(endpoint: &StageEndpoint, input: &I) -> Result<O>
where
	I: Serialize + ?Sized,
	O: DeserializeOwned,
{
	let client = Client::builder().timeout(Duration::from_millis(endpoint.timeout_ms)).build()?;
	let url = format!("{}{}", endpoint.api_base, endpoint.path);
	let res = client
		.post(&url)
		.headers(crate::auth_headers(endpoint.api_key.as_deref(), &endpoint.default_headers)?)
		.json(input)
		.send()
		.await?;

	tracing::debug!(%url, status = %res.status(), "Stage endpoint responded.");

	let json: Value = res.error_for_status()?.json().await?;

	parse_stage_response(json)
}

fn parse_stage_response<O>(json: Value) -> Result<O>
where
	O: DeserializeOwned,
{
	let Value::Object(mut body) = json else {
		return Err(Error::InvalidResponse {
			message: "Stage response must be a JSON object.".to_string(),
		});
	};

	if let Some(error) = body.get("error").filter(|error| !error.is_null()) {
		let message = error
			.as_str()
			.map(str::to_string)
			.or_else(|| error.get("message").and_then(Value::as_str).map(str::to_string))
			.unwrap_or_else(|| error.to_string());

		return Err(Error::Remote { message });
	}

	let output = match body.remove("output") {
		Some(output) => output,
		None => Value::Object(body),
	};

	Ok(serde_json::from_value(output)?)
}

#[cfg(test)]
mod tests {
	use serde::Deserialize;

	use super::*;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Echo {
		answer: String,
	}

	#[test]
	fn accepts_bare_output() {
		let parsed: Echo =
			parse_stage_response(serde_json::json!({ "answer": "42" })).expect("parse failed");

		assert_eq!(parsed, Echo { answer: "42".to_string() });
	}

	#[test]
	fn unwraps_output_envelope() {
		let parsed: Echo = parse_stage_response(serde_json::json!({
			"output": { "answer": "42" },
			"request_id": "r-1"
		}))
		.expect("parse failed");

		assert_eq!(parsed.answer, "42");
	}

	#[test]
	fn surfaces_remote_error_message() {
		let err = parse_stage_response::<Echo>(serde_json::json!({
			"error": { "message": "model overloaded" }
		}))
		.expect_err("error body must fail");

		assert_eq!(err.to_string(), "Stage endpoint returned an error: model overloaded");
	}

	#[test]
	fn rejects_non_object_body() {
		let err = parse_stage_response::<Echo>(serde_json::json!(["not", "an", "object"]))
			.expect_err("array body must fail");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}
}
