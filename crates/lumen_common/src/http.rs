//! Renders [`LumenError`] at the HTTP boundary.
//!
//! Handlers return `Result<Json<T>, LumenError>` and never build error
//! responses by hand: the `IntoResponse` impl below gives every failure the
//! same flat JSON body and a status code derived from the variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::LumenError;

/// The JSON body every failed request carries.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

impl LumenError {
    /// The status code this error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            LumenError::LogicError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LumenError::ParseError(_) | LumenError::ValidationError(_) => StatusCode::BAD_REQUEST,
            LumenError::AuthError(_) => StatusCode::UNAUTHORIZED,
            LumenError::NotFoundError(_) => StatusCode::NOT_FOUND,
            LumenError::ConfigError(_)
            | LumenError::StoreError(_)
            | LumenError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LumenError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tracks_the_variant() {
        assert_eq!(
            LumenError::LogicError("duplicate-name".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            LumenError::NotFoundError("not-found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LumenError::AuthError("invalid-token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LumenError::StoreError("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn logic_errors_render_their_code_verbatim() {
        // Logic-error codes are API surface; the Display impl must not wrap
        // them in prose.
        assert_eq!(
            LumenError::LogicError("duplicate-name".into()).to_string(),
            "duplicate-name"
        );
    }
}
