use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::submission_dto::{SubmissionDetailResponse, SubmitTestRequest, SubmitTestResponse};
use crate::dto::test_dto::{CreateTestPayload, TestDetailResponse, UpdateTestPayload};
use crate::error::Result;
use crate::middleware::auth::{self, Claims};
use crate::routes::courses::ensure_course_owner;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_tests_for_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let tests = state.test_service.list_for_course(course_id).await?;
    Ok(Json(tests))
}

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    auth::ensure_instructor(&claims)?;
    ensure_course_owner(&state, &claims, course_id).await?;
    payload.validate()?;

    let detail = state.test_service.create_test(course_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(TestDetailResponse {
            test: detail.test,
            questions: detail.questions,
        }),
    ))
}

#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.test_service.get_test(test_id).await?;
    Ok(Json(TestDetailResponse {
        test: detail.test,
        questions: detail.questions,
    }))
}

#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<UpdateTestPayload>,
) -> Result<impl IntoResponse> {
    auth::ensure_instructor(&claims)?;
    let existing = state.test_service.get_test(test_id).await?;
    ensure_course_owner(&state, &claims, existing.test.course_id).await?;
    payload.validate()?;

    let detail = state.test_service.update_test(test_id, payload).await?;
    Ok(Json(TestDetailResponse {
        test: detail.test,
        questions: detail.questions,
    }))
}

#[axum::debug_handler]
pub async fn delete_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    auth::ensure_instructor(&claims)?;
    let existing = state.test_service.get_test(test_id).await?;
    ensure_course_owner(&state, &claims, existing.test.course_id).await?;

    state.test_service.delete_test(test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a submission, grade it, and hand out the earned rewards.
#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let detail = state.test_service.get_test(test_id).await?;
    let submission = state
        .submission_service
        .submit(
            &state.ai_service,
            &detail.test,
            &detail.questions,
            user_id,
            payload,
        )
        .await?;

    let rewards = state.reward_service.award(&submission).await?;

    Ok(Json(SubmitTestResponse {
        submission,
        rewards,
    }))
}

#[axum::debug_handler]
pub async fn test_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state
        .submission_service
        .latest_for(test_id, claims.user_id()?)
        .await?;
    Ok(Json(SubmissionDetailResponse {
        submission: detail.submission,
        answers: detail.answers,
    }))
}
