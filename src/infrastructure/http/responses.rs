//! Response formatting for the HTTP surface

use std::convert::Infallible;

use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::shared::error::AppError;

/// Response formatter utilities
pub struct ResponseFormatter;

impl ResponseFormatter {
    /// JSON body with the given status
    pub fn json<T: Serialize>(body: &T, status: StatusCode) -> Response {
        warp::reply::with_status(warp::reply::json(body), status).into_response()
    }

    /// Error body with the status the error maps to
    pub fn error(err: &AppError) -> Response {
        Self::json(&err.to_error_body(), err.http_status_code())
    }
}

/// Turn rejections (unknown route, malformed body) into JSON errors
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    if let Some(err) = rejection.find::<AppError>() {
        return Ok(ResponseFormatter::error(err));
    }

    let (status, code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "Not found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "validation_error", err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "validation_error", err.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "Method not allowed".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal error".to_string())
    };

    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });
    Ok(ResponseFormatter::json(&body, status))
}
