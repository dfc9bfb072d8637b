use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::dto::chat_dto::ChatMessageRequest;
use crate::error::Result;
use crate::middleware::auth;
use crate::services::chat_service::{self, ChatContext, EnrolledCourseSummary, RecentActivity};
use crate::AppState;

/// Public chatbot endpoint; replies are personalised when the caller sends a
/// valid bearer token.
#[axum::debug_handler]
pub async fn chat_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user_context = match auth::optional_claims(&headers).and_then(|c| c.user_id().ok()) {
        Some(user_id) => Some(build_context(&state, user_id).await?),
        None => None,
    };

    let courses = state.course_service.published_briefs().await?;

    let reply = chat_service::process_message(
        &state.ai_service,
        &payload.message,
        user_context.as_ref(),
        &courses,
    )
    .await;

    Ok(Json(reply))
}

async fn build_context(state: &AppState, user_id: Uuid) -> Result<ChatContext> {
    let user = state.user_service.get(user_id).await?;

    let enrolled = sqlx::query_as::<_, (Uuid, String, String)>(
        r#"
        SELECT c.id, c.title, e.status
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.user_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let activity = sqlx::query_as::<_, (String, Option<i32>, chrono::DateTime<chrono::Utc>)>(
        r#"
        SELECT c.title, ts.score, ts.submitted_at
        FROM test_submissions ts
        JOIN tests t ON t.id = ts.test_id
        JOIN courses c ON c.id = t.course_id
        WHERE ts.user_id = $1
        ORDER BY ts.submitted_at DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ChatContext {
        enrolled_courses: enrolled
            .into_iter()
            .map(|(id, title, status)| EnrolledCourseSummary { id, title, status })
            .collect(),
        interests: user.interest_list(),
        recent_activity: activity
            .into_iter()
            .map(|(course, score, date)| RecentActivity {
                activity_type: "test".to_string(),
                course,
                score,
                date: date.to_rfc3339(),
            })
            .collect(),
    })
}
