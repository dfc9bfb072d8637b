use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::dto::payment_dto::{CreatePaymentPayload, FailPaymentPayload, PaymentCreatedResponse};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentPayload,
    responses(
        (status = 201, description = "Payment created", body = Json<PaymentCreatedResponse>),
        (status = 404, description = "Course not found")
    )
)]
#[axum::debug_handler]
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(claims.user_id()?).await?;
    let course = state.course_service.get(payload.course_id).await?;

    let payment = state
        .payment_service
        .create(
            &state.ai_service,
            &user,
            &course,
            payload.provider,
            payload.payment_data,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentCreatedResponse::from(payment)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/confirm",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment completed and buyer enrolled"),
        (status = 404, description = "Payment not found")
    )
)]
#[axum::debug_handler]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let payment = state
        .payment_service
        .confirm(payment_id, claims.user_id()?)
        .await?;
    Ok(Json(payment))
}

#[axum::debug_handler]
pub async fn fail_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<FailPaymentPayload>,
) -> Result<impl IntoResponse> {
    let payment = state
        .payment_service
        .fail(payment_id, claims.user_id()?, payload.error_message)
        .await?;
    Ok(Json(payment))
}

#[axum::debug_handler]
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let payments = state
        .payment_service
        .list_for_user(claims.user_id()?)
        .await?;
    Ok(Json(payments))
}

#[axum::debug_handler]
pub async fn list_discounts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let discounts = state
        .payment_service
        .active_discounts(claims.user_id()?)
        .await?;
    Ok(Json(discounts))
}
