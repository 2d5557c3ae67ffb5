//! HTTP handlers for the command log endpoints

use crate::command_log::LogStorage;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, warn};
use serde::Serialize;
use shared::NewCommandLog;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: &'static str,
}

fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, Json(ErrorBody { message })).into_response()
}

/// POST /api/logs
///
/// Validates the body before touching storage: any parse or schema failure
/// is a 400, any storage failure a 500. Neither leaks details to the caller.
pub async fn create_log(State(storage): State<Arc<dyn LogStorage>>, body: Bytes) -> Response {
    let input = match NewCommandLog::parse(&body) {
        Ok(input) => input,
        Err(e) => {
            debug!("Rejected command log: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid log data");
        }
    };

    match storage.log_command(input) {
        Ok(log) => (StatusCode::CREATED, Json(log)).into_response(),
        Err(e) => {
            warn!("Failed to store command log: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// GET /api/logs
pub async fn list_logs(State(storage): State<Arc<dyn LogStorage>>) -> Response {
    match storage.command_logs() {
        Ok(logs) => Json(logs).into_response(),
        Err(e) => {
            warn!("Failed to read command logs: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
