use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use sqlx::types::ipnetwork::IpNetwork;
use uuid::Uuid;
use validator::Validate;

use crate::dto::course_dto::{CourseListQuery, CreateCoursePayload, UpdateCoursePayload};
use crate::error::{Error, Result};
use crate::middleware::auth::{self, Claims};
use crate::models::course::Course;
use crate::services::advisor_service::{self, CourseBrief, HistoryEntry, LearnerProfile};
use crate::services::course_service::CourseFilter;
use crate::AppState;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[utoipa::path(
    get,
    path = "/api/courses",
    params(
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("level" = Option<String>, Query, description = "Filter by level"),
        ("search" = Option<String>, Query, description = "Title substring search")
    ),
    responses(
        (status = 200, description = "Published courses, newest first")
    )
)]
#[axum::debug_handler]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let listing = state
        .course_service
        .list(
            page,
            per_page,
            CourseFilter {
                category: query.category,
                level: query.level,
                search: query.search,
            },
        )
        .await?;

    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course details"),
        (status = 404, description = "Course not found")
    )
)]
#[axum::debug_handler]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let course = state.course_service.get(course_id).await?;
    if !course.is_published {
        return Err(Error::NotFound("Course not found".to_string()));
    }

    let viewer = auth::optional_claims(&headers).and_then(|c| c.user_id().ok());
    state
        .course_service
        .record_view(course.id, viewer, client_ip(&headers))
        .await?;

    Ok(Json(course))
}

#[axum::debug_handler]
pub async fn popular_courses(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let courses = state.course_service.popular().await?;
    Ok(Json(courses))
}

#[axum::debug_handler]
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.course_service.categories().await?))
}

#[axum::debug_handler]
pub async fn levels(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.course_service.levels().await?))
}

/// Advisor-ranked courses based on the caller's viewing history. Falls back
/// to the popular listing when the advisor has nothing to say.
#[axum::debug_handler]
pub async fn recommended_courses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let user = state.user_service.get(user_id).await?;

    let history = state.course_service.view_history(user_id, 10).await?;
    let available = state.course_service.briefs_not_viewed_by(user_id).await?;
    let popular: Vec<CourseBrief> = state
        .course_service
        .popular()
        .await?
        .into_iter()
        .map(course_brief)
        .collect();

    let profile = LearnerProfile {
        interests: user.interest_list(),
        average_score: state.submission_service.average_score(user_id).await?,
        completed_courses: state.course_service.completed_count(user_id).await?,
        learning_history: history
            .into_iter()
            .map(|brief| HistoryEntry {
                course_id: brief.id,
                title: brief.title,
                score: None,
                level: Some(brief.level),
            })
            .collect(),
    };

    let recommendations =
        advisor_service::recommend_courses(&state.ai_service, &profile, &available, &popular).await;

    // Resolve to full course rows, preserving the advisor's ranking.
    let ids: Vec<Uuid> = recommendations.iter().map(|r| r.course_id).collect();
    let courses = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&state.pool)
        .await?;
    let ranked: Vec<Course> = ids
        .iter()
        .filter_map(|id| courses.iter().find(|c| c.id == *id).cloned())
        .collect();

    Ok(Json(ranked))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCoursePayload,
    responses(
        (status = 201, description = "Course created"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not an instructor")
    )
)]
#[axum::debug_handler]
pub async fn create_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCoursePayload>,
) -> Result<impl IntoResponse> {
    let claims = auth::bearer_claims(&headers)?;
    auth::ensure_instructor(&claims)?;
    payload.validate()?;

    let course = state
        .course_service
        .create(payload, claims.user_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[axum::debug_handler]
pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCoursePayload>,
) -> Result<impl IntoResponse> {
    let claims = auth::bearer_claims(&headers)?;
    auth::ensure_instructor(&claims)?;
    payload.validate()?;
    ensure_course_owner(&state, &claims, course_id).await?;

    let course = state.course_service.update(course_id, payload).await?;
    Ok(Json(course))
}

#[axum::debug_handler]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let claims = auth::bearer_claims(&headers)?;
    auth::ensure_instructor(&claims)?;
    ensure_course_owner(&state, &claims, course_id).await?;

    state.course_service.delete(course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn ensure_course_owner(
    state: &AppState,
    claims: &Claims,
    course_id: Uuid,
) -> Result<()> {
    if auth::is_admin(claims) {
        return Ok(());
    }
    let course = state.course_service.get(course_id).await?;
    if course.instructor_id != claims.user_id()? {
        return Err(Error::Forbidden(
            "Only the course instructor can modify it".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn course_brief(course: Course) -> CourseBrief {
    CourseBrief {
        id: course.id,
        title: course.title,
        category: course.category,
        level: course.level,
    }
}

fn client_ip(headers: &HeaderMap) -> Option<IpNetwork> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse::<std::net::IpAddr>()
        .ok()
        .map(IpNetwork::from)
}
