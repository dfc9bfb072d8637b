use crate::models::reward::UserReward;
use crate::models::submission::{QuestionSubmission, TestSubmission};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitTestRequest {
    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub answers: Vec<AnswerPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub question_id: Uuid,
    pub answer_text: Option<String>,
    #[serde(default)]
    pub selected_choice_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SubmitTestResponse {
    pub submission: TestSubmission,
    pub rewards: Vec<UserReward>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetailResponse {
    #[serde(flatten)]
    pub submission: TestSubmission,
    pub answers: Vec<QuestionSubmission>,
}
