use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use relay_pipeline::{AnswerPayload, AnswerRequest};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/answer", post(answer))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerPayload>, ApiError> {
	validate_request(&payload)?;

	let response = state.controller.run(&payload).await;

	Ok(Json(response))
}

fn validate_request(request: &AnswerRequest) -> Result<(), ApiError> {
	let blank: Vec<String> = [
		("query", &request.query),
		("user_id", &request.user_id),
		("session_id", &request.session_id),
	]
	.into_iter()
	.filter(|(_, value)| value.trim().is_empty())
	.map(|(field, _)| field.to_string())
	.collect();

	if blank.is_empty() {
		return Ok(());
	}

	Err(json_error(
		StatusCode::BAD_REQUEST,
		"invalid_request",
		format!("Required fields must be non-empty: {}.", blank.join(", ")),
		Some(blank),
	))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		tracing::debug!(error_code = %self.error_code, message = %self.message, "Rejecting request.");

		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
