use crate::models::course::Course;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCoursePayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub price: Decimal,
    pub is_paid: Option<bool>,
    #[validate(length(min = 1))]
    pub category: String,
    #[validate(length(min = 1))]
    pub level: String,
    #[validate(range(min = 0))]
    pub duration_minutes: i32,
    pub prerequisites: Option<String>,
    pub objectives: Option<String>,
    pub syllabus: Option<String>,
    pub requirements: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCoursePayload {
    // Empty strings from the client mean "leave unchanged".
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    pub price: Option<Decimal>,
    pub is_paid: Option<bool>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub level: Option<String>,

    #[validate(range(min = 0))]
    pub duration_minutes: Option<i32>,

    pub prerequisites: Option<String>,
    pub objectives: Option<String>,
    pub syllabus: Option<String>,
    pub requirements: Option<String>,
    pub is_published: Option<bool>,
}

fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct CourseListQuery {
    pub category: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub items: Vec<Course>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}
