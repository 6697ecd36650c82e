use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use uuid::Uuid;

use taskmint_agent::ExtractionError;
use taskmint_core::errors::{ApplicationError, DomainError, InterfaceError};
use taskmint_db::RepositoryError;

/// Uniform JSON failure envelope: `{success: false, message, correlationId}`.
/// Client-fault statuses carry the specific message; server-fault statuses
/// carry a generic one and log the detail under the correlation id.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    correlation_id: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), correlation_id: Uuid::new_v4().to_string() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn from_application(error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let detail = error.to_string();
        let interface = error.into_interface(correlation_id.clone());

        let (status, message) = match &interface {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            InterfaceError::Unauthorized { .. } => {
                (StatusCode::UNAUTHORIZED, interface.user_message().to_string())
            }
            InterfaceError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, interface.user_message().to_string())
            }
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_string())
            }
            InterfaceError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(
                event_name = "api.request.failed",
                correlation_id = %correlation_id,
                detail = %detail,
                "request failed"
            );
        }

        Self { status, message, correlation_id }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self::from_application(ApplicationError::Domain(error))
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        Self::from_application(ApplicationError::Persistence(error.to_string()))
    }
}

impl From<ExtractionError> for ApiError {
    fn from(error: ExtractionError) -> Self {
        if error.is_input_error() {
            return Self::bad_request(error.to_string());
        }

        let correlation_id = Uuid::new_v4().to_string();
        tracing::error!(
            event_name = "api.extraction.failed",
            correlation_id = %correlation_id,
            detail = %error,
            "task extraction failed"
        );
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: "Failed to extract tasks from the provided text. Please try again."
                .to_string(),
            correlation_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "message": self.message,
            "correlationId": self.correlation_id,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use taskmint_agent::ExtractionError;
    use taskmint_core::errors::DomainError;

    use super::ApiError;

    #[test]
    fn domain_errors_map_to_bad_request_with_their_message() {
        let error = ApiError::from(DomainError::InvalidTaskNameLength(0));
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains("task name"));
    }

    #[test]
    fn extraction_input_errors_are_the_callers_fault() {
        let error = ApiError::from(ExtractionError::EmptyInput);
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn extraction_upstream_errors_map_to_bad_gateway() {
        let error =
            ApiError::from(ExtractionError::Completion(anyhow::anyhow!("connection reset")));
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert!(!error.message.contains("connection reset"), "detail must not leak to clients");
    }
}
