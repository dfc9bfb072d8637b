use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, crate::error::Error> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| crate::error::Error::Unauthorized("Invalid token subject".to_string()))
    }
}

fn decode_bearer(headers: &HeaderMap) -> Result<Claims, Response> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response());
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response());
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response());
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_token"})),
        )
            .into_response()
    })
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    match decode_bearer(req.headers()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

/// Claims for handlers living outside the auth-layered route group.
pub fn bearer_claims(headers: &HeaderMap) -> crate::error::Result<Claims> {
    decode_bearer(headers)
        .map_err(|_| crate::error::Error::Unauthorized("Authentication required".to_string()))
}

/// Instructor-only operations mixed into otherwise broader route groups.
pub fn ensure_instructor(claims: &Claims) -> crate::error::Result<()> {
    let role = claims.role.clone().unwrap_or_default();
    let allowed = ["instructor", "admin"];
    if allowed.iter().any(|r| r.eq_ignore_ascii_case(&role)) {
        Ok(())
    } else {
        Err(crate::error::Error::Forbidden(
            "Instructor role required".to_string(),
        ))
    }
}

pub fn is_admin(claims: &Claims) -> bool {
    claims
        .role
        .as_deref()
        .map(|r| r.eq_ignore_ascii_case("admin"))
        .unwrap_or(false)
}

/// Best-effort claims for public endpoints that personalise when a valid
/// bearer token happens to be present (e.g. the chatbot).
pub fn optional_claims(headers: &HeaderMap) -> Option<Claims> {
    decode_bearer(headers).ok()
}
