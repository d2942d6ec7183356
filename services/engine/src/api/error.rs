use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stockwatch_inventory::InventoryError;
use tracing::error;

use crate::db::DbError;
use crate::service::ServiceError;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
    pub retryable: bool,
}

impl ProblemDetails {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        let title = status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string();
        Self {
            r#type: format!("https://stockwatch.dev/problems/{code}"),
            title,
            status: status.as_u16(),
            detail: detail.into(),
            code,
            retryable: false,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn with_status(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let problem = Box::new(ProblemDetails::new(status, code, message));
        Self { status, problem }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    /// A request that failed extraction, keeping the rejection's status.
    pub fn from_rejection(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::with_status(status, code, message)
    }

    /// The upstream inventory API failed; the request may be retried.
    pub fn bad_gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::with_status(StatusCode::BAD_GATEWAY, code, message);
        err.problem.retryable = true;
        err
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Inventory(InventoryError::NotAvailable { .. }) => {
                Self::not_found("not_available", message)
            }
            ServiceError::Inventory(InventoryError::UnknownRegion(_)) => {
                Self::not_found("unknown_region", message)
            }
            ServiceError::Inventory(InventoryError::UnsupportedCountry { .. }) => {
                Self::bad_request("unsupported_country", message)
            }
            ServiceError::Inventory(InventoryError::Upstream(_)) => {
                Self::bad_gateway("upstream_error", message)
            }
            ServiceError::Store(DbError::AlreadyExists { .. }) => {
                Self::conflict("already_subscribed", message)
            }
            ServiceError::Store(DbError::NotFound(_)) => Self::not_found("not_found", message),
            other => {
                error!(error = %other, "Request failed");
                Self::internal("internal_error", "internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.problem)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_outcomes_are_not_server_errors() {
        let cases: Vec<ServiceError> = vec![
            InventoryError::NotAvailable {
                plan_code: "p".to_string(),
                datacenters: "gra".to_string(),
            }
            .into(),
            DbError::AlreadyExists {
                user_id: 1,
                criterion_id: 1,
            }
            .into(),
            DbError::NotFound("subscription".to_string()).into(),
        ];

        for err in cases {
            let api: ApiError = err.into();
            assert!(api.status.is_client_error(), "{:?}", api.status);
        }
    }

    #[test]
    fn test_conflict_code() {
        let api: ApiError = ServiceError::from(DbError::AlreadyExists {
            user_id: 1,
            criterion_id: 9,
        })
        .into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.problem.code, "already_subscribed");
        assert_eq!(api.problem.r#type, "https://stockwatch.dev/problems/already_subscribed");
    }
}
