use crate::models::question::{QuestionType, QuestionWithChoices};
use crate::models::test::{Test, TestType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub test_type: TestType,
    #[validate(range(min = 1))]
    pub max_score: i32,
    #[validate(range(min = 0))]
    pub passing_score: i32,
    #[validate(range(min = 1))]
    pub time_limit_minutes: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "A test must contain at least one question"))]
    pub questions: Vec<CreateQuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    pub question_type: QuestionType,
    #[validate(length(min = 1))]
    pub question_text: String,
    #[validate(range(min = 1))]
    pub points: i32,
    #[serde(default)]
    pub choices: Vec<CreateChoicePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateChoicePayload {
    #[validate(length(min = 1, max = 200))]
    pub choice_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub test_type: Option<TestType>,
    #[validate(range(min = 1))]
    pub max_score: Option<i32>,
    #[validate(range(min = 0))]
    pub passing_score: Option<i32>,
    #[validate(range(min = 1))]
    pub time_limit_minutes: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    /// When present, replaces the whole question set.
    pub questions: Option<Vec<CreateQuestionPayload>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestDetailResponse {
    #[serde(flatten)]
    pub test: Test,
    pub questions: Vec<QuestionWithChoices>,
}
