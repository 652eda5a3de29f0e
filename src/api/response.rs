//! JSON response envelope and error mapping.
//!
//! Successful responses look like `{"status":"success","data":...}`.
//! Failures come in two shapes: structured errors carrying a machine-readable
//! code and type, and plain failures carrying only a message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::{error, warn};

use crate::error::SubscriptionError;

/// Successful response with an optional payload.
#[derive(Debug)]
pub struct ApiSuccess<T> {
    status: StatusCode,
    data: Option<T>,
}

impl<T> ApiSuccess<T> {
    /// 200 with `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data: Some(data),
        }
    }

    /// 201 with `data`.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data: Some(data),
        }
    }
}

impl ApiSuccess<()> {
    /// 200 without a payload.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            data: None,
        }
    }
}

#[derive(Serialize)]
struct SuccessBody<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            status: "success",
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The named resource does not exist.
    ResourceNotFound,
    /// No flow info is available for the subscription.
    NoFlowInfo,
    /// The subscription URL could not be fetched.
    UrlNotAccessible,
    /// The request body does not match the expected shape.
    InvalidBody,
    /// The store failed to read or write.
    StorageFailure,
}

/// Error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ErrorType {
    /// Missing resource.
    ResourceNotFoundError,
    /// Server-side failure.
    InternalServerError,
    /// Failure talking to a remote.
    NetworkError,
    /// Malformed request.
    RequestInvalidError,
}

/// Error response.
#[derive(Debug)]
pub enum ApiError {
    /// `{"status":"failed","error":{"code","type","message"}}`
    Structured {
        /// HTTP status.
        status: StatusCode,
        /// Error code.
        code: ErrorCode,
        /// Error type.
        kind: ErrorType,
        /// Human-readable message.
        message: String,
    },
    /// `{"status":"failed","message"}`
    Plain {
        /// HTTP status.
        status: StatusCode,
        /// Human-readable message.
        message: String,
    },
}

impl ApiError {
    /// Structured error.
    pub fn structured(
        status: StatusCode,
        code: ErrorCode,
        kind: ErrorType,
        message: impl Into<String>,
    ) -> Self {
        Self::Structured {
            status,
            code,
            kind,
            message: message.into(),
        }
    }

    /// Plain failure.
    pub fn plain(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Plain {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Structured { status, .. } | Self::Plain { status, .. } => *status,
        }
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Structured {
                status,
                code,
                kind,
                message,
            } => {
                if code == ErrorCode::StorageFailure {
                    error!(%code, %message, "Request failed");
                } else {
                    warn!(%code, %message, "Request failed");
                }
                let detail = ErrorDetail {
                    code: code.into(),
                    kind: kind.into(),
                    message,
                };
                (
                    status,
                    ErrorBody {
                        status: "failed",
                        error: Some(detail),
                        message: None,
                    },
                )
            }
            Self::Plain { status, message } => {
                warn!(%status, %message, "Request failed");
                (
                    status,
                    ErrorBody {
                        status: "failed",
                        error: None,
                        message: Some(message),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Structured mapping used by the flow endpoint and for storage failures.
impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::NotFound(name) => Self::structured(
                StatusCode::NOT_FOUND,
                ErrorCode::ResourceNotFound,
                ErrorType::ResourceNotFoundError,
                format!("Subscription {name} does not exist!"),
            ),
            SubscriptionError::LocalSource(_) | SubscriptionError::NoFlowInfo(_) => {
                Self::structured(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::NoFlowInfo,
                    ErrorType::InternalServerError,
                    "N/A",
                )
            }
            SubscriptionError::Unreachable { name, .. } => Self::structured(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::UrlNotAccessible,
                ErrorType::NetworkError,
                format!("The URL for subscription {name} is inaccessible."),
            ),
            SubscriptionError::AlreadyExists(name) => Self::plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Subscription {name} already exists!"),
            ),
            SubscriptionError::Store(e) => Self::structured(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::StorageFailure,
                ErrorType::InternalServerError,
                e.to_string(),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::structured(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidBody,
            ErrorType::RequestInvalidError,
            rejection.body_text(),
        )
    }
}
