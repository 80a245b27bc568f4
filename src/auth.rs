use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
};

/// Header the upstream gateway sets once it has authenticated the caller.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user an API call acts on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing x-user-id header".to_string()))?;

        let raw = header
            .to_str()
            .map_err(|_| AppError::Authentication("Invalid x-user-id header".to_string()))?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::Authentication("Invalid user ID".to_string()))?;

        Ok(ActingUser { user_id })
    }
}
