use super::handler::ApiResponse;
use crate::application_port::*;
use crate::domain_model::PostError;
use crate::domain_port::PostRepoError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (*code, code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, ApiErrorCode::InternalError.to_string())
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token is not valid")]
    TokenInvalid,
    #[error("Token was revoked or is not recognized")]
    TokenRevoked,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error("Credentials are required")]
    MissingCredential,
    #[error("Insufficient authority")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Username is already taken")]
    UserExists,
    #[error("Post is no longer pending")]
    InvalidStateTransition,
    #[error("Rejection reason is required")]
    MissingRejectionReason,
    #[error("Invalid input")]
    InvalidInput,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::TokenInvalid
            | ApiErrorCode::TokenRevoked
            | ApiErrorCode::AccountDisabled
            | ApiErrorCode::MissingCredential => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::UserExists | ApiErrorCode::InvalidStateTransition => {
                StatusCode::CONFLICT
            }
            ApiErrorCode::MissingRejectionReason | ApiErrorCode::InvalidInput => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthRejection> for ApiErrorCode {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::TokenExpired => ApiErrorCode::TokenExpired,
            AuthRejection::TokenInvalid => ApiErrorCode::TokenInvalid,
            AuthRejection::TokenRevoked => ApiErrorCode::TokenRevoked,
            AuthRejection::AccountDisabled => ApiErrorCode::AccountDisabled,
            AuthRejection::MissingCredential => ApiErrorCode::MissingCredential,
            AuthRejection::Unavailable => ApiErrorCode::Unavailable,
        }
    }
}

impl From<AuthzError> for ApiErrorCode {
    fn from(_: AuthzError) -> Self {
        ApiErrorCode::Forbidden
    }
}

impl From<SessionError> for ApiErrorCode {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::TokenInvalid => ApiErrorCode::TokenInvalid,
            SessionError::TokenExpired => ApiErrorCode::TokenExpired,
            SessionError::TokenRevoked => ApiErrorCode::TokenRevoked,
            SessionError::AccountDisabled => ApiErrorCode::AccountDisabled,
            SessionError::Directory(e) => {
                warn!("User directory unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            SessionError::Registry(e) => {
                warn!("Token registry unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            SessionError::Codec(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::AccountDisabled => ApiErrorCode::AccountDisabled,
            AuthError::UserExists => ApiErrorCode::UserExists,
            AuthError::InvalidInput(_) => ApiErrorCode::InvalidInput,
            AuthError::Session(e) => e.into(),
            AuthError::Store(e) => {
                warn!("Credential store unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<ModerationError> for ApiErrorCode {
    fn from(error: ModerationError) -> Self {
        match error {
            ModerationError::PostNotFound => ApiErrorCode::NotFound,
            ModerationError::InvalidStateTransition { .. } => ApiErrorCode::InvalidStateTransition,
            ModerationError::MissingRejectionReason => ApiErrorCode::MissingRejectionReason,
            ModerationError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<PostRepoError> for ApiErrorCode {
    fn from(error: PostRepoError) -> Self {
        match error {
            PostRepoError::NotFound => ApiErrorCode::NotFound,
            PostRepoError::Invalid(PostError::InvalidStateTransition { .. }) => {
                ApiErrorCode::InvalidStateTransition
            }
            PostRepoError::Invalid(_) => ApiErrorCode::InvalidInput,
            PostRepoError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}
