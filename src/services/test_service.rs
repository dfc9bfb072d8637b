use crate::dto::test_dto::{CreateQuestionPayload, CreateTestPayload, UpdateTestPayload};
use crate::error::{Error, Result};
use crate::models::choice::Choice;
use crate::models::question::{Question, QuestionType, QuestionWithChoices};
use crate::models::test::Test;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TestDetail {
    pub test: Test,
    pub questions: Vec<QuestionWithChoices>,
}

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(
        &self,
        course_id: Uuid,
        payload: CreateTestPayload,
    ) -> Result<TestDetail> {
        validate_questions(&payload.questions)?;

        let mut tx = self.pool.begin().await?;

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (
                course_id, title, description, test_type, max_score, passing_score,
                time_limit_minutes, due_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.test_type)
        .bind(payload.max_score)
        .bind(payload.passing_score)
        .bind(payload.time_limit_minutes)
        .bind(payload.due_date)
        .fetch_one(&mut *tx)
        .await?;

        let questions = insert_questions(&mut tx, test.id, &payload.questions).await?;

        tx.commit().await?;

        Ok(TestDetail { test, questions })
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<TestDetail> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;

        let questions = self.load_questions(test_id).await?;

        Ok(TestDetail { test, questions })
    }

    /// Questions of a test in stored order, each with its choices.
    pub async fn load_questions(&self, test_id: Uuid) -> Result<Vec<QuestionWithChoices>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE test_id = $1 ORDER BY position",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let choices = sqlx::query_as::<_, Choice>(
            r#"
            SELECT c.* FROM choices c
            JOIN questions q ON q.id = c.question_id
            WHERE q.test_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions
            .into_iter()
            .map(|question| {
                let question_choices = choices
                    .iter()
                    .filter(|c| c.question_id == question.id)
                    .cloned()
                    .collect();
                QuestionWithChoices {
                    question,
                    choices: question_choices,
                }
            })
            .collect())
    }

    pub async fn list_for_course(&self, course_id: Uuid) -> Result<Vec<Test>> {
        let tests = sqlx::query_as::<_, Test>(
            "SELECT * FROM tests WHERE course_id = $1 ORDER BY created_at DESC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tests)
    }

    pub async fn update_test(
        &self,
        test_id: Uuid,
        payload: UpdateTestPayload,
    ) -> Result<TestDetail> {
        if let Some(questions) = &payload.questions {
            validate_questions(questions)?;
        }

        let mut tx = self.pool.begin().await?;

        let test = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                test_type = COALESCE($3, test_type),
                max_score = COALESCE($4, max_score),
                passing_score = COALESCE($5, passing_score),
                time_limit_minutes = COALESCE($6, time_limit_minutes),
                due_date = COALESCE($7, due_date),
                updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.test_type)
        .bind(payload.max_score)
        .bind(payload.passing_score)
        .bind(payload.time_limit_minutes)
        .bind(payload.due_date)
        .bind(test_id)
        .fetch_one(&mut *tx)
        .await?;

        let replaced = match payload.questions {
            Some(new_questions) => {
                sqlx::query("DELETE FROM questions WHERE test_id = $1")
                    .bind(test_id)
                    .execute(&mut *tx)
                    .await?;
                Some(insert_questions(&mut tx, test_id, &new_questions).await?)
            }
            None => None,
        };

        tx.commit().await?;

        let questions = match replaced {
            Some(questions) => questions,
            None => self.load_questions(test_id).await?,
        };

        Ok(TestDetail { test, questions })
    }

    pub async fn delete_test(&self, test_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(test_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    test_id: Uuid,
    payloads: &[CreateQuestionPayload],
) -> Result<Vec<QuestionWithChoices>> {
    let mut questions = Vec::with_capacity(payloads.len());

    for (idx, payload) in payloads.iter().enumerate() {
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (test_id, question_type, question_text, points, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(test_id)
        .bind(payload.question_type)
        .bind(&payload.question_text)
        .bind(payload.points)
        .bind((idx as i32) + 1)
        .fetch_one(&mut **tx)
        .await?;

        let mut choices = Vec::with_capacity(payload.choices.len());
        for choice_payload in &payload.choices {
            let choice = sqlx::query_as::<_, Choice>(
                r#"
                INSERT INTO choices (question_id, choice_text, is_correct)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(question.id)
            .bind(&choice_payload.choice_text)
            .bind(choice_payload.is_correct)
            .fetch_one(&mut **tx)
            .await?;
            choices.push(choice);
        }

        questions.push(QuestionWithChoices { question, choices });
    }

    Ok(questions)
}

/// Domain invariants the derive-level validation cannot express.
fn validate_questions(questions: &[CreateQuestionPayload]) -> Result<()> {
    if questions.is_empty() {
        return Err(Error::BadRequest(
            "A test must contain at least one question".to_string(),
        ));
    }

    for (idx, question) in questions.iter().enumerate() {
        let label = idx + 1;
        let correct_count = question.choices.iter().filter(|c| c.is_correct).count();

        match question.question_type {
            QuestionType::MultipleChoice => {
                if question.choices.len() < 2 {
                    return Err(Error::BadRequest(format!(
                        "Question {}: multiple choice questions need at least 2 choices",
                        label
                    )));
                }
            }
            QuestionType::TrueFalse => {
                if question.choices.len() < 2 {
                    return Err(Error::BadRequest(format!(
                        "Question {}: true/false questions need at least 2 choices",
                        label
                    )));
                }
                if correct_count != 1 {
                    return Err(Error::BadRequest(format!(
                        "Question {}: true/false questions need exactly one correct choice",
                        label
                    )));
                }
            }
            QuestionType::ShortAnswer | QuestionType::Programming => {
                // At most a single reference answer for the grader's prompt.
                if question.choices.len() > 1 {
                    return Err(Error::BadRequest(format!(
                        "Question {}: free-text questions accept at most one reference answer",
                        label
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::test_dto::CreateChoicePayload;

    fn choice(text: &str, is_correct: bool) -> CreateChoicePayload {
        CreateChoicePayload {
            choice_text: text.to_string(),
            is_correct,
        }
    }

    fn question(
        question_type: QuestionType,
        choices: Vec<CreateChoicePayload>,
    ) -> CreateQuestionPayload {
        CreateQuestionPayload {
            question_type,
            question_text: "q".to_string(),
            points: 5,
            choices,
        }
    }

    #[test]
    fn zero_question_tests_are_rejected() {
        assert!(validate_questions(&[]).is_err());
    }

    #[test]
    fn true_false_requires_exactly_one_correct_choice() {
        let none_correct = question(
            QuestionType::TrueFalse,
            vec![choice("True", false), choice("False", false)],
        );
        assert!(validate_questions(&[none_correct]).is_err());

        let both_correct = question(
            QuestionType::TrueFalse,
            vec![choice("True", true), choice("False", true)],
        );
        assert!(validate_questions(&[both_correct]).is_err());

        let one_correct = question(
            QuestionType::TrueFalse,
            vec![choice("True", true), choice("False", false)],
        );
        assert!(validate_questions(&[one_correct]).is_ok());
    }

    #[test]
    fn multiple_choice_requires_two_choices() {
        let single = question(QuestionType::MultipleChoice, vec![choice("only", true)]);
        assert!(validate_questions(&[single]).is_err());
    }

    #[test]
    fn free_text_allows_at_most_one_reference_answer() {
        let with_reference = question(QuestionType::ShortAnswer, vec![choice("42", true)]);
        assert!(validate_questions(&[with_reference]).is_ok());

        let with_two = question(
            QuestionType::Programming,
            vec![choice("a", true), choice("b", false)],
        );
        assert!(validate_questions(&[with_two]).is_err());
    }
}
