use crate::dto::course_dto::{CourseListResponse, CreateCoursePayload, UpdateCoursePayload};
use crate::error::Result;
use crate::models::course::{Course, Enrollment};
use crate::services::advisor_service::CourseBrief;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::PgPool;
use uuid::Uuid;

const POPULAR_WINDOW_DAYS: i32 = 30;
const POPULAR_LIMIT: i64 = 6;

#[derive(Debug, Default)]
pub struct CourseFilter {
    pub category: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct CourseService {
    pool: PgPool,
}

impl CourseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payload: CreateCoursePayload, instructor_id: Uuid) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (
                title, description, instructor_id, price, is_paid, category, level,
                duration_minutes, prerequisites, objectives, syllabus, requirements,
                is_published
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(instructor_id)
        .bind(payload.price)
        .bind(payload.is_paid.unwrap_or(true))
        .bind(&payload.category)
        .bind(&payload.level)
        .bind(payload.duration_minutes)
        .bind(&payload.prerequisites)
        .bind(&payload.objectives)
        .bind(&payload.syllabus)
        .bind(&payload.requirements)
        .bind(payload.is_published.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    pub async fn update(&self, course_id: Uuid, payload: UpdateCoursePayload) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                price = COALESCE($3, price),
                is_paid = COALESCE($4, is_paid),
                category = COALESCE($5, category),
                level = COALESCE($6, level),
                duration_minutes = COALESCE($7, duration_minutes),
                prerequisites = COALESCE($8, prerequisites),
                objectives = COALESCE($9, objectives),
                syllabus = COALESCE($10, syllabus),
                requirements = COALESCE($11, requirements),
                is_published = COALESCE($12, is_published),
                updated_at = NOW()
            WHERE id = $13
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.price)
        .bind(payload.is_paid)
        .bind(&payload.category)
        .bind(&payload.level)
        .bind(payload.duration_minutes)
        .bind(&payload.prerequisites)
        .bind(&payload.objectives)
        .bind(&payload.syllabus)
        .bind(&payload.requirements)
        .bind(payload.is_published)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    pub async fn delete(&self, course_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, course_id: Uuid) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(course)
    }

    pub async fn record_view(
        &self,
        course_id: Uuid,
        user_id: Option<Uuid>,
        ip_address: Option<IpNetwork>,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO course_views (course_id, user_id, ip_address) VALUES ($1, $2, $3)"#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(ip_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(
        &self,
        page: i64,
        per_page: i64,
        filter: CourseFilter,
    ) -> Result<CourseListResponse> {
        let offset = (page - 1) * per_page;
        let search = filter.search.map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM courses
            WHERE is_published = TRUE
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR level = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
            "#,
        )
        .bind(&filter.category)
        .bind(&filter.level)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Course>(
            r#"
            SELECT * FROM courses
            WHERE is_published = TRUE
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR level = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&filter.category)
        .bind(&filter.level)
        .bind(&search)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = if per_page > 0 {
            (total as f64 / per_page as f64).ceil() as i64
        } else {
            1
        };

        Ok(CourseListResponse {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Most viewed published courses over the trailing month.
    pub async fn popular(&self) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT c.* FROM courses c
            JOIN course_views v ON v.course_id = c.id
            WHERE c.is_published = TRUE
              AND v.viewed_at >= NOW() - ($1 * INTERVAL '1 day')
            GROUP BY c.id
            ORDER BY COUNT(v.id) DESC
            LIMIT $2
            "#,
        )
        .bind(POPULAR_WINDOW_DAYS)
        .bind(POPULAR_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM courses ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    pub async fn levels(&self) -> Result<Vec<String>> {
        let levels: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT level FROM courses ORDER BY level")
                .fetch_all(&self.pool)
                .await?;
        Ok(levels)
    }

    pub async fn published_briefs(&self) -> Result<Vec<CourseBrief>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT id, title, category, level FROM courses
            WHERE is_published = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(brief_from_row).collect())
    }

    /// Published courses the user has not viewed yet; the candidate pool for
    /// view-history based recommendations.
    pub async fn briefs_not_viewed_by(&self, user_id: Uuid) -> Result<Vec<CourseBrief>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT id, title, category, level FROM courses
            WHERE is_published = TRUE
              AND id NOT IN (SELECT course_id FROM course_views WHERE user_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(brief_from_row).collect())
    }

    /// Published courses the user has not completed; the candidate pool for
    /// performance based recommendations.
    pub async fn briefs_not_completed_by(&self, user_id: Uuid) -> Result<Vec<CourseBrief>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT id, title, category, level FROM courses
            WHERE is_published = TRUE
              AND id NOT IN (
                  SELECT course_id FROM enrollments WHERE user_id = $1 AND status = 'completed'
              )
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(brief_from_row).collect())
    }

    /// The user's most recently viewed courses, newest first.
    pub async fn view_history(&self, user_id: Uuid, limit: i64) -> Result<Vec<CourseBrief>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT c.id, c.title, c.category, c.level
            FROM course_views v
            JOIN courses c ON c.id = v.course_id
            WHERE v.user_id = $1
            ORDER BY v.viewed_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(brief_from_row).collect())
    }

    pub async fn enrollments_for(
        &self,
        user_id: Uuid,
        status: Option<&str>,
    ) -> Result<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT * FROM enrollments
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY enrolled_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(enrollments)
    }

    pub async fn completed_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE user_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

fn brief_from_row((id, title, category, level): (Uuid, String, String, String)) -> CourseBrief {
    CourseBrief {
        id,
        title,
        category,
        level,
    }
}
