use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor_id: Uuid,
    pub price: Decimal,
    pub is_paid: bool,
    pub category: String,
    pub level: String,
    pub duration_minutes: i32,
    pub prerequisites: Option<String>,
    pub objectives: Option<String>,
    pub syllabus: Option<String>,
    pub requirements: Option<String>,
    pub is_published: bool,
    pub rating: Decimal,
    pub ai_recommended: bool,
    pub ai_recommendation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub enrolled_at: DateTime<Utc>,
}
