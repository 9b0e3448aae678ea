use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::{access::AccessDenied, order_status::TransitionError, promo::PromoRejection},
    response::{ApiResponse, Meta},
    services::otp_store::OtpError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid or expired promo code")]
    InvalidPromo,

    #[error("Request timed out, please retry")]
    Timeout,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::InvalidPromo => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            // clients expect 400 for stock/promo conflicts
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(err: AccessDenied) -> Self {
        AppError::Forbidden(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Illegal { .. } => AppError::Conflict(err.to_string()),
            TransitionError::Unknown(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<PromoRejection> for AppError {
    fn from(err: PromoRejection) -> Self {
        match err {
            PromoRejection::Invalid => AppError::InvalidPromo,
            PromoRejection::Expired
            | PromoRejection::NotYetActive
            | PromoRejection::BelowMinimum(_) => AppError::BadRequest(err.to_string()),
            PromoRejection::LimitReached | PromoRejection::AlreadyUsed => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let message = self.to_string();

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
