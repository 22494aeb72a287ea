//! IdP error taxonomy.
//!
//! Every protocol service converts codec-layer failures at its own boundary
//! into one of these named outcomes; nothing else escapes to the transport
//! layer.

use crate::codec::CodecError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type for IdP operations.
pub type IdpResult<T> = Result<T, IdpError>;

#[derive(Debug, Error)]
pub enum IdpError {
    /// Malformed or missing request field, unparsable body.
    #[error("{0}")]
    BadRequest(String),

    /// Failed or missing credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// A signed redirect-binding request did not verify against any of the
    /// issuer's signing certificates.
    #[error("Message signature verification failure")]
    SignatureVerification,

    /// The requesting principal is unknown to trust metadata.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    /// The requested response binding is not supported.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// No route match, unknown artifact/assertion ID, missing static file.
    #[error("not found: {0}")]
    NotFound(String),

    /// Logout could not resolve the identity's authentication state.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The broker has no method satisfying the requested authn context.
    #[error("No usable authentication method")]
    NoUsableAuthnMethod,

    /// Unexpected failure; full detail is logged, the caller sees a generic
    /// message.
    #[error("service error: {0}")]
    ServiceError(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for IdpError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            IdpError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            IdpError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            IdpError::SignatureVerification => {
                (StatusCode::BAD_REQUEST, "signature_verification_failed")
            }
            IdpError::UnknownPrincipal(_) => (StatusCode::BAD_REQUEST, "unknown_principal"),
            IdpError::UnsupportedBinding(_) => (StatusCode::BAD_REQUEST, "unsupported_binding"),
            IdpError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            IdpError::UnknownSession(_) => (StatusCode::BAD_REQUEST, "unknown_session"),
            IdpError::NoUsableAuthnMethod => {
                (StatusCode::UNAUTHORIZED, "no_usable_authn_method")
            }
            IdpError::ServiceError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "service_error"),
        };

        let message = match &self {
            IdpError::ServiceError(detail) => {
                tracing::error!(detail = %detail, "service error");
                "An internal error occurred".to_string()
            }
            IdpError::UnknownPrincipal(_)
            | IdpError::UnsupportedBinding(_)
            | IdpError::SignatureVerification => {
                tracing::error!(error = %self, "request rejected");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<CodecError> for IdpError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownPrincipal(s) => IdpError::UnknownPrincipal(s),
            CodecError::UnsupportedBinding(s) => IdpError::UnsupportedBinding(s),
            CodecError::UnknownSubject(s) => IdpError::NotFound(s),
            CodecError::Policy(s) | CodecError::Malformed(s) => IdpError::BadRequest(s),
            CodecError::Internal(s) => IdpError::ServiceError(s),
        }
    }
}
