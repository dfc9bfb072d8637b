use axum::{extract::State, response::IntoResponse, Extension, Json};
use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse, UserProfile};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (user, token) = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from(user),
    }))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(claims.user_id()?).await?;
    Ok(Json(UserProfile::from(user)))
}
