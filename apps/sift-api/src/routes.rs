use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post, put},
};
use serde::Serialize;

use sift_domain::{
	Preferences, RankingWeights, TopicScores,
	preferences::{RoleTypeMatrix, SpecializationTopics},
};
use sift_index::FilterOptions;
use sift_service::{
	ClickRequest, ClickResponse, Error, ImpressionsRequest, ImpressionsResponse, ListUsersRequest,
	PresetList, SearchRequest, SearchResponse, TotalStatsResponse, UserRecord, UserStatsResponse,
	WeightsResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/v1/search", post(search))
		.route("/api/v1/search/click", post(register_click))
		.route("/api/v1/search/impressions", post(register_impressions))
		.route("/api/v1/search/filters", get(filter_options))
		.route("/api/v1/search/stats", get(total_stats))
		.route("/api/v1/settings/weights", get(get_weights))
		.route("/api/v1/settings/presets", get(list_presets))
		.route("/api/v1/settings/preferences", get(get_preferences))
		.route("/api/v1/settings/role-type-matrix", get(get_role_type_matrix))
		.route("/api/v1/settings/topic-scores", get(get_topic_scores))
		.route("/api/v1/settings/specialization-topics", get(get_specialization_topics))
		.route("/api/v1/users", get(list_users))
		.route("/api/v1/users/{user_id}", get(get_user))
		.route("/api/v1/users/{user_id}/stats", get(user_stats))
		.with_state(state)
}

/// Settings writes. Served on the loopback admin listener only.
pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/api/v1/settings/weights", put(set_weights))
		.route("/api/v1/settings/presets/{name}", post(apply_preset))
		.route("/api/v1/settings/reset", post(reset_weights))
		.route("/api/v1/settings/preferences", put(set_preferences))
		.route("/api/v1/settings/role-type-matrix", put(set_role_type_matrix))
		.route("/api/v1/settings/topic-scores", put(set_topic_scores))
		.route("/api/v1/settings/specialization-topics", put(set_specialization_topics))
		.route("/api/v1/settings/preferences/reset", post(reset_preferences))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	Ok(Json(state.service.search(payload).await?))
}

async fn register_click(
	State(state): State<AppState>,
	Json(payload): Json<ClickRequest>,
) -> Result<Json<ClickResponse>, ApiError> {
	Ok(Json(state.service.register_click(payload).await?))
}

async fn register_impressions(
	State(state): State<AppState>,
	Json(payload): Json<ImpressionsRequest>,
) -> Result<Json<ImpressionsResponse>, ApiError> {
	Ok(Json(state.service.register_impressions(payload).await?))
}

async fn filter_options(State(state): State<AppState>) -> Result<Json<FilterOptions>, ApiError> {
	Ok(Json(state.service.filter_options().await?))
}

async fn total_stats(
	State(state): State<AppState>,
) -> Result<Json<TotalStatsResponse>, ApiError> {
	Ok(Json(state.service.total_stats().await?))
}

async fn get_weights(State(state): State<AppState>) -> Json<WeightsResponse> {
	Json(state.service.settings.weights_snapshot())
}

async fn set_weights(
	State(state): State<AppState>,
	Json(payload): Json<RankingWeights>,
) -> Result<Json<WeightsResponse>, ApiError> {
	Ok(Json(state.service.settings.set_weights(payload)?))
}

async fn list_presets(State(state): State<AppState>) -> Json<PresetList> {
	Json(state.service.settings.list_presets())
}

async fn apply_preset(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<WeightsResponse>, ApiError> {
	Ok(Json(state.service.settings.apply_preset(&name)?))
}

async fn reset_weights(State(state): State<AppState>) -> Json<WeightsResponse> {
	Json(state.service.settings.reset())
}

async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
	Json(Preferences::clone(&state.service.settings.preferences()))
}

async fn set_preferences(
	State(state): State<AppState>,
	Json(payload): Json<Preferences>,
) -> Result<Json<Preferences>, ApiError> {
	let prefs = state.service.settings.set_preferences(payload)?;

	Ok(Json(Preferences::clone(&prefs)))
}

async fn get_role_type_matrix(State(state): State<AppState>) -> Json<RoleTypeMatrix> {
	Json(state.service.settings.preferences().role_type_matrix.clone())
}

async fn set_role_type_matrix(
	State(state): State<AppState>,
	Json(payload): Json<RoleTypeMatrix>,
) -> Result<Json<RoleTypeMatrix>, ApiError> {
	let prefs = state.service.settings.set_role_type_matrix(payload)?;

	Ok(Json(prefs.role_type_matrix.clone()))
}

async fn get_topic_scores(State(state): State<AppState>) -> Json<TopicScores> {
	Json(state.service.settings.preferences().topic_scores)
}

async fn set_topic_scores(
	State(state): State<AppState>,
	Json(payload): Json<TopicScores>,
) -> Result<Json<TopicScores>, ApiError> {
	Ok(Json(state.service.settings.set_topic_scores(payload)?.topic_scores))
}

async fn get_specialization_topics(State(state): State<AppState>) -> Json<SpecializationTopics> {
	Json(state.service.settings.preferences().specialization_topics.clone())
}

async fn set_specialization_topics(
	State(state): State<AppState>,
	Json(payload): Json<SpecializationTopics>,
) -> Result<Json<SpecializationTopics>, ApiError> {
	let prefs = state.service.settings.set_specialization_topics(payload)?;

	Ok(Json(prefs.specialization_topics.clone()))
}

async fn reset_preferences(State(state): State<AppState>) -> Json<Preferences> {
	Json(Preferences::clone(&state.service.settings.reset_preferences()))
}

async fn list_users(
	State(state): State<AppState>,
	Query(params): Query<ListUsersRequest>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
	Ok(Json(state.service.list_users(params).await?))
}

async fn get_user(
	State(state): State<AppState>,
	Path(user_id): Path<i64>,
) -> Result<Json<UserRecord>, ApiError> {
	Ok(Json(state.service.get_user(user_id).await?))
}

async fn user_stats(
	State(state): State<AppState>,
	Path(user_id): Path<i64>,
) -> Result<Json<UserStatsResponse>, ApiError> {
	Ok(Json(state.service.user_stats(user_id).await?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into(), fields: None }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			Error::Validation { .. } =>
				Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message),
			Error::UnknownPreset { name } => Self {
				fields: Some(vec![name]),
				..Self::new(StatusCode::BAD_REQUEST, "UNKNOWN_PRESET", message)
			},
			Error::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			Error::UpstreamUnavailable { .. } =>
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE", message),
			Error::Registration { .. } =>
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "REGISTRATION_FAILED", message),
			Error::Storage { .. } => {
				tracing::warn!(error = %message, "Storage request failed.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, "DATABASE_ERROR", "Database unavailable.")
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
