use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use fieldsense_core::calibration::{self, CalibrationInput, CalibrationRecord};
use fieldsense_core::db::DbPool;
use fieldsense_core::error::StoreError;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/setcalibration", post(create_calibration))
        .route("/api/soildata", get(list_soil_data))
        .route("/api/updatecalibration", put(update_calibration))
        .route("/api/deletecalibration/{id}", delete(delete_calibration))
        .with_state(state)
}

pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            StoreError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            StoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            StoreError::Database(err) => {
                tracing::error!("database operation failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn create_calibration(
    State(state): State<AppState>,
    Json(input): Json<CalibrationInput>,
) -> Result<(StatusCode, Json<CalibrationRecord>), ApiError> {
    let record = calibration::create_calibration(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_soil_data(
    State(state): State<AppState>,
) -> Result<Json<Vec<CalibrationRecord>>, ApiError> {
    let records = calibration::list_calibrations(&state.pool).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    id: i64,
    #[serde(flatten)]
    record: CalibrationInput,
}

async fn update_calibration(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CalibrationRecord>, ApiError> {
    let record = calibration::update_calibration(&state.pool, request.id, &request.record).await?;
    Ok(Json(record))
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    message: String,
    data: Vec<CalibrationRecord>,
}

async fn delete_calibration(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let remaining = calibration::delete_calibration(&state.pool, id).await?;
    Ok(Json(DeleteResponse {
        message: "Record deleted successfully".to_string(),
        data: remaining,
    }))
}
