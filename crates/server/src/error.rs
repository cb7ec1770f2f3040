//! Gateway errors as HTTP responses: `{ "error": <message>, "kind": <ErrorKind> }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hashirama_api::{ErrorKind, GatewayError};

#[derive(Debug)]
pub struct ApiError {
    pub error: GatewayError,
    status: StatusCode,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        let status = match error.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists | ErrorKind::LookupFailed | ErrorKind::CreateFailed | ErrorKind::DeleteFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { error, status }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidInput(rejection.body_text()).into()
    }
}

impl ApiError {
    /// Collection routes report every orchestrator-side failure as 500,
    /// a missing name included; `kind` still says `NotFound`.
    pub fn on_collection(error: GatewayError) -> Self {
        let mut e = Self::from(error);
        if e.status == StatusCode::NOT_FOUND {
            e.status = StatusCode::INTERNAL_SERVER_ERROR;
        }
        e
    }

    pub fn status(&self) -> StatusCode { self.status }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.error.message(),
            "kind": self.error.kind(),
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ApiError::from(GatewayError::InvalidInput("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(GatewayError::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(GatewayError::AlreadyExists("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::from(GatewayError::DeleteFailed("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn collection_routes_keep_not_found_in_the_5xx_range() {
        let e = ApiError::on_collection(GatewayError::NotFound("gone".into()));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.error.kind(), ErrorKind::NotFound);
        assert_eq!(ApiError::on_collection(GatewayError::InvalidInput("x".into())).status(), StatusCode::BAD_REQUEST);
    }
}
