use crate::day::{DayKey, parse_offset_minutes};
use crate::errors::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::FixedOffset;
use uuid::Uuid;

pub const USER_HEADER: &str = "x-user-id";
pub const GUEST_HEADER: &str = "x-guest-id";
pub const OFFSET_HEADER: &str = "x-utc-offset-minutes";

/// Who a request acts for. Account ids come from the external auth provider as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Guest(Uuid),
    Account(String),
}

impl SessionKey {
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    pub offset: Option<FixedOffset>,
}

impl Session {
    pub fn today(&self) -> DayKey {
        DayKey::today_at(self.offset)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = if let Some(user_id) = header(parts, USER_HEADER) {
            SessionKey::Account(user_id.to_string())
        } else if let Some(guest_id) = header(parts, GUEST_HEADER) {
            let id = Uuid::parse_str(guest_id)
                .map_err(|_| AppError::unauthorized("malformed guest id"))?;
            SessionKey::Guest(id)
        } else {
            return Err(AppError::unauthorized(
                "start a guest session or sign in first",
            ));
        };

        let offset = match header(parts, OFFSET_HEADER) {
            Some(value) => Some(
                parse_offset_minutes(value)
                    .ok_or_else(|| AppError::bad_request("invalid utc offset"))?,
            ),
            None => None,
        };

        Ok(Session { key, offset })
    }
}
