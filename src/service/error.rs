use ulid::Ulid;

use crate::model::{Field, Holder};
use crate::store::StoreError;

/// Entity kinds named in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    School,
    Team,
    Match,
    AgendaEvent,
    Live,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::School => "school",
            Entity::Team => "team",
            Entity::Match => "match",
            Entity::AgendaEvent => "agenda event",
            Entity::Live => "live",
        };
        f.write_str(name)
    }
}

/// Error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Authorization,
    Persistence,
}

#[derive(Debug)]
pub enum ServiceError {
    Unauthorized(String),
    MissingParameters,
    InvalidParameters(&'static str),
    InvalidDates,
    LimitExceeded(&'static str),
    /// A referenced team or school does not exist.
    UnknownReference(Entity),
    NotFound(Entity, Ulid),
    FieldAlreadyBooked { field: Field, holder: Holder },
    AlreadyExists(Entity),
    AlreadyPlayed(Ulid),
    InvalidScore,
    LiveAlreadyRunning,
    Persistence(StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthorized(_) => ErrorKind::Authorization,
            ServiceError::MissingParameters
            | ServiceError::InvalidParameters(_)
            | ServiceError::InvalidDates
            | ServiceError::LimitExceeded(_)
            | ServiceError::UnknownReference(_) => ErrorKind::Validation,
            ServiceError::NotFound(..) => ErrorKind::NotFound,
            ServiceError::FieldAlreadyBooked { .. }
            | ServiceError::AlreadyExists(_)
            | ServiceError::AlreadyPlayed(_)
            | ServiceError::InvalidScore
            | ServiceError::LiveAlreadyRunning => ErrorKind::Conflict,
            ServiceError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Stable machine code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized(_) => "AUTH_ERROR",
            ServiceError::MissingParameters => "MISSING_PARAMETERS",
            ServiceError::InvalidParameters(_) => "INVALID_PARAMETERS",
            ServiceError::InvalidDates => "INVALID_DATES",
            ServiceError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            ServiceError::UnknownReference(_) => "REFERENCE_NOT_FOUND",
            ServiceError::NotFound(..) => "NOT_FOUND",
            ServiceError::FieldAlreadyBooked { .. } => "FIELD_ALREADY_BOOKED",
            ServiceError::AlreadyExists(_) => "ALREADY_EXISTS",
            ServiceError::AlreadyPlayed(_) => "MATCH_ALREADY_PLAYED",
            ServiceError::InvalidScore => "INVALID_SCORE",
            ServiceError::LiveAlreadyRunning => "LIVE_ALREADY_RUNNING",
            ServiceError::Persistence(_) => "DB_ERROR",
        }
    }

    /// Message safe to show callers. Storage detail never leaks.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Persistence(_) => "database error".into(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Unauthorized(reason) => write!(f, "unauthorized: {reason}"),
            ServiceError::MissingParameters => write!(f, "missing parameters"),
            ServiceError::InvalidParameters(what) => write!(f, "invalid parameters: {what}"),
            ServiceError::InvalidDates => write!(f, "invalid dates"),
            ServiceError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            ServiceError::UnknownReference(Entity::Team) => write!(f, "team(s) not found"),
            ServiceError::UnknownReference(entity) => write!(f, "{entity} not found"),
            ServiceError::NotFound(entity, id) => write!(f, "{entity} not found: {id}"),
            ServiceError::FieldAlreadyBooked { field, holder } => {
                write!(f, "field {field} already booked by {holder}")
            }
            ServiceError::AlreadyExists(entity) => write!(f, "{entity} already exists"),
            ServiceError::AlreadyPlayed(id) => write!(f, "match already played: {id}"),
            ServiceError::InvalidScore => write!(f, "invalid score"),
            ServiceError::LiveAlreadyRunning => write!(f, "a live is already running"),
            ServiceError::Persistence(e) => write!(f, "persistence error: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Persistence(e)
    }
}
