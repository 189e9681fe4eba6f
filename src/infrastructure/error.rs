use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("calendar api error: http {status}: {message}")]
    CalendarHttp { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Push(#[from] PushError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("no calendar credential; connect Google Calendar first")]
    NoToken,
    #[error("schedule has no tasks to push")]
    NoTasks,
    #[error("calendar credential expired; reconnect and push again")]
    TokenExpired,
    #[error("calendar credential lacks the calendar events scope; reconnect and grant access")]
    InsufficientPermissions,
    #[error("API_ERROR: {0}")]
    ApiError(String),
    #[error("a calendar push is already in progress")]
    InProgress,
}

impl PushError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoToken => "NO_TOKEN",
            Self::NoTasks => "NO_TASKS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::ApiError(_) => "API_ERROR",
            Self::InProgress => "PUSH_IN_PROGRESS",
        }
    }

    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::InsufficientPermissions)
    }

    pub(crate) fn severity(&self) -> u8 {
        match self {
            Self::TokenExpired => 3,
            Self::InsufficientPermissions => 2,
            _ => 1,
        }
    }
}

impl From<InfraError> for PushError {
    fn from(error: InfraError) -> Self {
        match error {
            InfraError::CalendarHttp { status: 401, .. } => Self::TokenExpired,
            InfraError::CalendarHttp { status: 403, .. } => Self::InsufficientPermissions,
            InfraError::CalendarHttp { message, .. } => Self::ApiError(message),
            InfraError::Push(error) => error,
            other => Self::ApiError(other.to_string()),
        }
    }
}
