use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of question kinds. Grading dispatches on this enum, so an
/// unhandled kind is a compile error rather than a runtime fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Programming,
}

/// A question together with its (possibly empty) ordered choices, as loaded
/// for grading and for the instructor/student test views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithChoices {
    pub question: Question,
    pub choices: Vec<crate::models::choice::Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub test_id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub points: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
