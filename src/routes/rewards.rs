use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::services::advisor_service::{self, HistoryEntry, LearnerProfile, RecentScore};
use crate::routes::courses::course_brief;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DifficultyAdjustmentItem {
    pub course_id: Uuid,
    pub course_title: String,
    pub difficulty: String,
    pub practice_recommendations: Vec<String>,
    pub prerequisites_to_review: Vec<String>,
}

#[axum::debug_handler]
pub async fn list_rewards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let rewards = state.reward_service.list_for_user(claims.user_id()?).await?;
    Ok(Json(rewards))
}

/// Advisor course recommendations driven by the caller's grading history.
#[axum::debug_handler]
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let user = state.user_service.get(user_id).await?;

    let history = sqlx::query_as::<_, (Uuid, String, Option<i32>, String)>(
        r#"
        SELECT c.id, c.title, ts.score, c.level
        FROM test_submissions ts
        JOIN tests t ON t.id = ts.test_id
        JOIN courses c ON c.id = t.course_id
        WHERE ts.user_id = $1
        ORDER BY ts.submitted_at DESC
        LIMIT 10
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let profile = LearnerProfile {
        interests: user.interest_list(),
        average_score: state.submission_service.average_score(user_id).await?,
        completed_courses: state.course_service.completed_count(user_id).await?,
        learning_history: history
            .into_iter()
            .map(|(course_id, title, score, level)| HistoryEntry {
                course_id,
                title,
                score,
                level: Some(level),
            })
            .collect(),
    };

    let available = state.course_service.briefs_not_completed_by(user_id).await?;
    let popular: Vec<_> = state
        .course_service
        .popular()
        .await?
        .into_iter()
        .map(course_brief)
        .collect();

    let recommendations =
        advisor_service::recommend_courses(&state.ai_service, &profile, &available, &popular).await;

    Ok(Json(recommendations))
}

/// Difficulty suggestions for every course the caller is currently taking.
#[axum::debug_handler]
pub async fn difficulty_adjustment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let enrollments = state
        .course_service
        .enrollments_for(user_id, Some("in_progress"))
        .await?;

    let mut items = Vec::with_capacity(enrollments.len());
    for enrollment in enrollments {
        let course = state.course_service.get(enrollment.course_id).await?;

        let rows = sqlx::query_as::<_, (String, Option<i32>)>(
            r#"
            SELECT t.title, ts.score
            FROM test_submissions ts
            JOIN tests t ON t.id = ts.test_id
            WHERE ts.user_id = $1 AND t.course_id = $2 AND ts.score IS NOT NULL
            ORDER BY ts.submitted_at DESC
            LIMIT 5
            "#,
        )
        .bind(user_id)
        .bind(course.id)
        .fetch_all(&state.pool)
        .await?;

        let recent: Vec<RecentScore> = rows
            .into_iter()
            .filter_map(|(test, score)| score.map(|s| RecentScore { test, score: s }))
            .collect();
        let average = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|r| r.score as f64).sum::<f64>() / recent.len() as f64
        };

        let adjustment = advisor_service::adjust_difficulty(
            &state.ai_service,
            &course.title,
            &course.level,
            average,
            &recent,
        )
        .await;

        items.push(DifficultyAdjustmentItem {
            course_id: course.id,
            course_title: course.title,
            difficulty: adjustment.difficulty,
            practice_recommendations: adjustment.practice_recommendations,
            prerequisites_to_review: adjustment.prerequisites_to_review,
        });
    }

    Ok(Json(items))
}
