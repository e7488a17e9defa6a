use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

/// Failures a backend can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("stat {0} was already completed today")]
    AlreadyCompletedToday(String),

    #[error("maximum of {0} stats allowed")]
    MaxStatsExceeded(usize),

    #[error("minimum of {0} stats required")]
    MinStatsRequired(usize),

    #[error("stat not found: {0}")]
    StatNotFound(String),

    #[error("onboarding already completed")]
    AlreadyOnboarded,

    #[error("session not found; start a new one")]
    UnknownSession,

    #[error("{0}")]
    Invalid(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("mirror sync failed: {0}")]
    MirrorSyncFailed(String),
}

impl QuestError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyCompletedToday(_) => "already_completed_today",
            Self::MaxStatsExceeded(_) => "max_stats_exceeded",
            Self::MinStatsRequired(_) => "min_stats_required",
            Self::StatNotFound(_) => "stat_not_found",
            Self::AlreadyOnboarded => "already_onboarded",
            Self::UnknownSession => "no_session",
            Self::Invalid(_) => "invalid",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::MirrorSyncFailed(_) => "mirror_sync_failed",
        }
    }
}

impl From<StoreError> for QuestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::StatNotFound(id),
            other => Self::BackendUnavailable(other.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid",
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "no_session",
            message: message.into(),
        }
    }
}

impl From<QuestError> for AppError {
    fn from(err: QuestError) -> Self {
        let status = match &err {
            QuestError::AlreadyCompletedToday(_) | QuestError::AlreadyOnboarded => {
                StatusCode::CONFLICT
            }
            QuestError::MaxStatsExceeded(_) | QuestError::MinStatsRequired(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            QuestError::StatNotFound(_) => StatusCode::NOT_FOUND,
            QuestError::UnknownSession => StatusCode::UNAUTHORIZED,
            QuestError::Invalid(_) => StatusCode::BAD_REQUEST,
            QuestError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            QuestError::MirrorSyncFailed(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        QuestError::from(err).into()
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({ "error": self.kind, "message": self.message }));
        (self.status, body).into_response()
    }
}
