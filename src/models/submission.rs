use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a test submission. `Pending` transitions to exactly one of
/// the terminal states when the evaluator finishes; it is never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Graded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSubmission {
    pub id: Uuid,
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub score: Option<i32>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
    pub ai_feedback: Option<String>,
    pub ai_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionSubmission {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub question_id: Uuid,
    pub answer_text: Option<String>,
    pub selected_choice_ids: Vec<Uuid>,
    pub score: Option<i32>,
    pub ai_feedback: Option<String>,
}
