use crate::dto::submission_dto::SubmitTestRequest;
use crate::error::{Error, Result};
use crate::models::question::QuestionWithChoices;
use crate::models::submission::{QuestionSubmission, SubmissionStatus, TestSubmission};
use crate::models::test::Test;
use crate::services::ai_service::TextGenerator;
use crate::services::evaluation_service::{EvaluationOutcome, Evaluator};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SubmissionDetail {
    pub submission: TestSubmission,
    pub answers: Vec<QuestionSubmission>,
}

#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
}

impl SubmissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Accept and grade a submission.
    ///
    /// The pipeline is: validate the payload against the test's questions
    /// (nothing is written on a validation failure), record the pending
    /// submission with its answers in one transaction, evaluate everything
    /// in memory, then persist all per-question scores together with the
    /// terminal status transition in a second, single transaction. A crash
    /// between the two leaves a `pending` submission with unscored answers,
    /// never a half-graded one.
    pub async fn submit<G: TextGenerator>(
        &self,
        gen: &G,
        test: &Test,
        questions: &[QuestionWithChoices],
        user_id: Uuid,
        payload: SubmitTestRequest,
    ) -> Result<TestSubmission> {
        validate_answers(questions, &payload)?;

        let mut tx = self.pool.begin().await?;

        let submission = sqlx::query_as::<_, TestSubmission>(
            r#"
            INSERT INTO test_submissions (test_id, user_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING *
            "#,
        )
        .bind(test.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut answers = Vec::with_capacity(payload.answers.len());
        for answer in &payload.answers {
            let row = sqlx::query_as::<_, QuestionSubmission>(
                r#"
                INSERT INTO question_submissions (
                    submission_id, question_id, answer_text, selected_choice_ids
                ) VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(submission.id)
            .bind(answer.question_id)
            .bind(&answer.answer_text)
            .bind(&answer.selected_choice_ids)
            .fetch_one(&mut *tx)
            .await?;
            answers.push(row);
        }

        tx.commit().await?;

        let outcome = Evaluator::evaluate(gen, test, questions, &answers).await;

        self.finalize(&submission, &outcome).await
    }

    /// Persist a computed evaluation: every per-question result plus the
    /// parent's one-time transition out of `pending`, atomically.
    async fn finalize(
        &self,
        submission: &TestSubmission,
        outcome: &EvaluationOutcome,
    ) -> Result<TestSubmission> {
        let status = if outcome.passed {
            SubmissionStatus::Graded
        } else {
            SubmissionStatus::Failed
        };

        let mut tx = self.pool.begin().await?;

        for grade in &outcome.question_grades {
            let Some(question_submission_id) = grade.question_submission_id else {
                continue;
            };
            sqlx::query(
                r#"UPDATE question_submissions SET score = $1, ai_feedback = $2 WHERE id = $3"#,
            )
            .bind(grade.score)
            .bind(&grade.feedback)
            .bind(question_submission_id)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, TestSubmission>(
            r#"
            UPDATE test_submissions
            SET score = $1, status = $2, ai_feedback = $3, ai_score = $4, graded_at = NOW()
            WHERE id = $5 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(outcome.score)
        .bind(status)
        .bind(&outcome.feedback)
        .bind(outcome.normalized_score)
        .bind(submission.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// The caller's most recent submission for a test, with its answers.
    pub async fn latest_for(&self, test_id: Uuid, user_id: Uuid) -> Result<SubmissionDetail> {
        let submission = sqlx::query_as::<_, TestSubmission>(
            r#"
            SELECT * FROM test_submissions
            WHERE test_id = $1 AND user_id = $2
            ORDER BY submitted_at DESC
            LIMIT 1
            "#,
        )
        .bind(test_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("No submission found".to_string()))?;

        let answers = sqlx::query_as::<_, QuestionSubmission>(
            "SELECT * FROM question_submissions WHERE submission_id = $1",
        )
        .bind(submission.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(SubmissionDetail {
            submission,
            answers,
        })
    }

    pub async fn average_score(&self, user_id: Uuid) -> Result<f64> {
        let average: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(score)::float8 FROM test_submissions WHERE user_id = $1 AND score IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(average.unwrap_or(0.0))
    }
}

/// Reject unknown questions, unknown or foreign choices, and duplicate
/// answers before anything is persisted.
fn validate_answers(questions: &[QuestionWithChoices], payload: &SubmitTestRequest) -> Result<()> {
    let mut seen: HashSet<Uuid> = HashSet::new();

    for answer in &payload.answers {
        let Some(bundle) = questions.iter().find(|q| q.question.id == answer.question_id) else {
            return Err(Error::BadRequest(format!(
                "Unknown question id: {}",
                answer.question_id
            )));
        };

        if !seen.insert(answer.question_id) {
            return Err(Error::BadRequest(format!(
                "Duplicate answer for question {}",
                answer.question_id
            )));
        }

        for choice_id in &answer.selected_choice_ids {
            if !bundle.choices.iter().any(|c| c.id == *choice_id) {
                return Err(Error::BadRequest(format!(
                    "Choice {} does not belong to question {}",
                    choice_id, answer.question_id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::submission_dto::AnswerPayload;
    use crate::models::choice::Choice;
    use crate::models::question::{Question, QuestionType};
    use chrono::Utc;

    fn bundle() -> QuestionWithChoices {
        let question_id = Uuid::new_v4();
        QuestionWithChoices {
            question: Question {
                id: question_id,
                test_id: Uuid::new_v4(),
                question_type: QuestionType::MultipleChoice,
                question_text: "q".to_string(),
                points: 1,
                position: 1,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            choices: vec![Choice {
                id: Uuid::new_v4(),
                question_id,
                choice_text: "a".to_string(),
                is_correct: true,
                created_at: Utc::now(),
            }],
        }
    }

    fn request(answers: Vec<AnswerPayload>) -> SubmitTestRequest {
        SubmitTestRequest { answers }
    }

    #[test]
    fn unknown_question_id_is_rejected() {
        let questions = vec![bundle()];
        let result = validate_answers(
            &questions,
            &request(vec![AnswerPayload {
                question_id: Uuid::new_v4(),
                answer_text: None,
                selected_choice_ids: vec![],
            }]),
        );
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn duplicate_answers_are_rejected() {
        let questions = vec![bundle()];
        let question_id = questions[0].question.id;
        let answer = AnswerPayload {
            question_id,
            answer_text: None,
            selected_choice_ids: vec![],
        };
        let result = validate_answers(&questions, &request(vec![answer.clone(), answer]));
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn foreign_choice_ids_are_rejected() {
        let questions = vec![bundle()];
        let result = validate_answers(
            &questions,
            &request(vec![AnswerPayload {
                question_id: questions[0].question.id,
                answer_text: None,
                selected_choice_ids: vec![Uuid::new_v4()],
            }]),
        );
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn well_formed_answers_pass_validation() {
        let questions = vec![bundle()];
        let result = validate_answers(
            &questions,
            &request(vec![AnswerPayload {
                question_id: questions[0].question.id,
                answer_text: None,
                selected_choice_ids: vec![questions[0].choices[0].id],
            }]),
        );
        assert!(result.is_ok());
    }
}
