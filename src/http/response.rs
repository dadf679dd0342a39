use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};
use ulid::Ulid;

use crate::auth::{AuthError, Scheme};
use crate::service::{ErrorKind, ServiceError};

use super::AppState;

/// Success body shared by every route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: &'static str,
    pub message: &'static str,
    pub data: T,
}

pub type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    reply(StatusCode::OK, data)
}

pub fn created<T>(data: T) -> ApiResult<T> {
    reply(StatusCode::CREATED, data)
}

fn reply<T>(status: StatusCode, data: T) -> ApiResult<T> {
    Ok((
        status,
        Json(Envelope {
            code: "SUCCESS",
            message: "Success",
            data,
        }),
    ))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Failure as a status plus the `{code, message}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_PARAMETERS",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match e.kind() {
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::Persistence => {
                error!("request failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: e.code(),
            message: e.public_message(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let status = match e {
            AuthError::Signing(_) => {
                error!("{e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => {
                metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
                StatusCode::UNAUTHORIZED
            }
        };
        Self {
            status,
            code: "AUTH_ERROR",
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// ── Extractors ───────────────────────────────────────────────────

/// Raw `Authorization` header, if any. Checking it is the service's job.
pub struct Credential(pub Option<String>);

impl Credential {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

fn authorization(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl<S: Send + Sync> FromRequestParts<S> for Credential {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Credential(authorization(parts)))
    }
}

/// Bearer header already accepted by the admin gate. Listed ahead of
/// `IdParam` and `JsonBody` in mutating handlers, so an anonymous caller
/// gets 401 before any id or body is looked at.
pub struct Admin(Option<String>);

impl Admin {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let value = authorization(parts);
        if let Err(e) = state.admin.check(value.as_deref(), Scheme::Bearer) {
            warn!("rejected mutation on {}: {e}", parts.uri.path());
            return Err(e.into());
        }
        Ok(Admin(value))
    }
}

/// `{id}` path segment parsed as a ULID; a bad id is a 400 in the envelope.
pub struct IdParam(pub Ulid);

impl<S: Send + Sync> FromRequestParts<S> for IdParam {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::invalid("invalid id"))?;
        raw.parse::<Ulid>()
            .map(IdParam)
            .map_err(|_| ApiError::invalid(format!("invalid id: {raw}")))
    }
}

/// JSON body whose rejection is a 400 in the envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?;
        Ok(JsonBody(value))
    }
}
