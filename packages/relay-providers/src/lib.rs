pub mod stage;

mod error;

pub use error::{Error, Result};
pub use stage::invoke;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: Option<&str>, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_bearer_and_default_headers() {
		let mut defaults = Map::new();

		defaults.insert("x-tenant".to_string(), Value::String("docs".to_string()));

		let headers = auth_headers(Some("secret"), &defaults).expect("headers failed");

		assert_eq!(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()), Some("Bearer secret"));
		assert_eq!(headers.get("x-tenant").and_then(|v| v.to_str().ok()), Some("docs"));
	}

	#[test]
	fn omits_authorization_without_key() {
		let headers = auth_headers(None, &Map::new()).expect("headers failed");

		assert!(headers.get(AUTHORIZATION).is_none());
	}

	#[test]
	fn rejects_non_string_header_values() {
		let mut defaults = Map::new();

		defaults.insert("x-retries".to_string(), Value::from(3));

		assert!(matches!(auth_headers(None, &defaults), Err(Error::InvalidConfig { .. })));
	}
}
