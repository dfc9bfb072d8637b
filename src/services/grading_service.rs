use crate::models::choice::Choice;
use crate::models::question::{Question, QuestionType};
use crate::models::submission::QuestionSubmission;
use crate::services::ai_service::{ChatPrompt, TextGenerator};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub score: i32,
    pub feedback: String,
}

pub struct Grader;

impl Grader {
    /// Grade one submitted answer against its question. Pure over the
    /// provided entities; only the free-text kinds reach out to the text
    /// generator, and a failed call grades to zero instead of erroring.
    pub async fn grade<G: TextGenerator>(
        gen: &G,
        question: &Question,
        choices: &[Choice],
        answer: &QuestionSubmission,
    ) -> GradeResult {
        match question.question_type {
            QuestionType::MultipleChoice => Self::grade_multiple_choice(question, choices, answer),
            QuestionType::TrueFalse => Self::grade_true_false(question, choices, answer),
            QuestionType::ShortAnswer => Self::grade_short_answer(gen, question, choices, answer).await,
            QuestionType::Programming => Self::grade_programming(gen, question, choices, answer).await,
        }
    }

    /// All-or-nothing: full points iff the selected set equals the correct
    /// set, regardless of order. No partial credit.
    fn grade_multiple_choice(
        question: &Question,
        choices: &[Choice],
        answer: &QuestionSubmission,
    ) -> GradeResult {
        let correct: BTreeSet<Uuid> = choices.iter().filter(|c| c.is_correct).map(|c| c.id).collect();
        let selected: BTreeSet<Uuid> = answer.selected_choice_ids.iter().copied().collect();

        let score = if selected == correct { question.points } else { 0 };

        let feedback = format!(
            "Selected: {}. Correct: {}.",
            join_choice_texts(choices, &selected),
            join_choice_texts(choices, &correct),
        );

        GradeResult { score, feedback }
    }

    /// Compared by choice identity, not by text. A missing selection simply
    /// scores zero.
    fn grade_true_false(
        question: &Question,
        choices: &[Choice],
        answer: &QuestionSubmission,
    ) -> GradeResult {
        let correct = choices.iter().find(|c| c.is_correct);
        let selected = answer
            .selected_choice_ids
            .first()
            .and_then(|id| choices.iter().find(|c| c.id == *id));

        let score = match (selected, correct) {
            (Some(s), Some(c)) if s.id == c.id => question.points,
            _ => 0,
        };

        let feedback = format!(
            "Your answer: {}. Correct answer: {}.",
            selected.map(|c| c.choice_text.as_str()).unwrap_or("No answer"),
            correct.map(|c| c.choice_text.as_str()).unwrap_or("Not set"),
        );

        GradeResult { score, feedback }
    }

    async fn grade_short_answer<G: TextGenerator>(
        gen: &G,
        question: &Question,
        choices: &[Choice],
        answer: &QuestionSubmission,
    ) -> GradeResult {
        let reference = choices
            .iter()
            .find(|c| c.is_correct)
            .map(|c| c.choice_text.as_str())
            .unwrap_or("Not provided");

        let prompt = format!(
            "Evaluate this short answer question:\n\n\
             Question: {}\n\
             Correct answer: {}\n\
             Student's answer: {}\n\n\
             Provide:\n\
             1. Score (0-{})\n\
             2. Brief feedback",
            question.question_text,
            reference,
            answer.answer_text.as_deref().unwrap_or(""),
            question.points,
        );

        match gen
            .generate(ChatPrompt {
                system: "You are an educational assessment system.",
                user: prompt,
                temperature: 0.3,
                max_tokens: 150,
            })
            .await
        {
            // TODO: parse the numeric score out of the response instead of
            // awarding full points on any successful call.
            Ok(text) => GradeResult {
                score: question.points,
                feedback: text,
            },
            Err(e) => GradeResult {
                score: 0,
                feedback: format!("Error evaluating answer: {}", e),
            },
        }
    }

    async fn grade_programming<G: TextGenerator>(
        gen: &G,
        question: &Question,
        choices: &[Choice],
        answer: &QuestionSubmission,
    ) -> GradeResult {
        let expected = choices
            .iter()
            .find(|c| c.is_correct)
            .map(|c| c.choice_text.as_str())
            .unwrap_or("Not provided");

        let prompt = format!(
            "Review this programming submission:\n\n\
             Question: {}\n\
             Expected output: {}\n\
             Student's code: {}\n\n\
             Provide:\n\
             1. Code quality score (0-{})\n\
             2. Detailed feedback including:\n\
                - Code correctness\n\
                - Code style\n\
                - Performance considerations\n\
                - Best practices",
            question.question_text,
            expected,
            answer.answer_text.as_deref().unwrap_or(""),
            question.points,
        );

        match gen
            .generate(ChatPrompt {
                system: "You are an expert code reviewer.",
                user: prompt,
                temperature: 0.3,
                max_tokens: 500,
            })
            .await
        {
            Ok(text) => GradeResult {
                score: question.points,
                feedback: text,
            },
            Err(e) => GradeResult {
                score: 0,
                feedback: format!("Error reviewing code: {}", e),
            },
        }
    }
}

fn join_choice_texts(choices: &[Choice], ids: &BTreeSet<Uuid>) -> String {
    let texts: Vec<&str> = choices
        .iter()
        .filter(|c| ids.contains(&c.id))
        .map(|c| c.choice_text.as_str())
        .collect();
    if texts.is_empty() {
        "none".to_string()
    } else {
        texts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::testing::{FailingGenerator, StaticGenerator};
    use chrono::Utc;

    fn question(question_type: QuestionType, points: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            question_type,
            question_text: "What is 2 + 2?".to_string(),
            points,
            position: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn choice(question_id: Uuid, text: &str, is_correct: bool) -> Choice {
        Choice {
            id: Uuid::new_v4(),
            question_id,
            choice_text: text.to_string(),
            is_correct,
            created_at: Utc::now(),
        }
    }

    fn answer(question_id: Uuid, selected: Vec<Uuid>, text: Option<&str>) -> QuestionSubmission {
        QuestionSubmission {
            id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            question_id,
            answer_text: text.map(|t| t.to_string()),
            selected_choice_ids: selected,
            score: None,
            ai_feedback: None,
        }
    }

    #[tokio::test]
    async fn multiple_choice_exact_match_earns_full_points() {
        let q = question(QuestionType::MultipleChoice, 5);
        let choices = vec![
            choice(q.id, "3", false),
            choice(q.id, "4", true),
            choice(q.id, "2 + 2", true),
        ];
        let selected = vec![choices[2].id, choices[1].id];

        let result = Grader::grade(&StaticGenerator(""), &q, &choices, &answer(q.id, selected, None)).await;
        assert_eq!(result.score, 5);
    }

    #[tokio::test]
    async fn multiple_choice_never_gives_partial_credit() {
        let q = question(QuestionType::MultipleChoice, 10);
        let choices = vec![
            choice(q.id, "a", true),
            choice(q.id, "b", true),
            choice(q.id, "c", false),
        ];
        // One of two correct choices selected: still zero.
        let result = Grader::grade(
            &StaticGenerator(""),
            &q,
            &choices,
            &answer(q.id, vec![choices[0].id], None),
        )
        .await;
        assert_eq!(result.score, 0);

        // Superset of the correct set: also zero.
        let result = Grader::grade(
            &StaticGenerator(""),
            &q,
            &choices,
            &answer(q.id, vec![choices[0].id, choices[1].id, choices[2].id], None),
        )
        .await;
        assert_eq!(result.score, 0);
    }

    #[tokio::test]
    async fn true_false_missing_selection_scores_zero() {
        let q = question(QuestionType::TrueFalse, 5);
        let choices = vec![choice(q.id, "True", true), choice(q.id, "False", false)];

        let result =
            Grader::grade(&StaticGenerator(""), &q, &choices, &answer(q.id, vec![], None)).await;
        assert_eq!(result.score, 0);
        assert!(result.feedback.contains("No answer"));
    }

    #[tokio::test]
    async fn true_false_matches_by_identity() {
        let q = question(QuestionType::TrueFalse, 5);
        let choices = vec![choice(q.id, "True", true), choice(q.id, "False", false)];

        let right =
            Grader::grade(&StaticGenerator(""), &q, &choices, &answer(q.id, vec![choices[0].id], None))
                .await;
        assert_eq!(right.score, 5);

        let wrong =
            Grader::grade(&StaticGenerator(""), &q, &choices, &answer(q.id, vec![choices[1].id], None))
                .await;
        assert_eq!(wrong.score, 0);
    }

    #[tokio::test]
    async fn short_answer_awards_full_points_on_success() {
        let q = question(QuestionType::ShortAnswer, 8);
        let result = Grader::grade(
            &StaticGenerator("Good reasoning, minor gaps."),
            &q,
            &[],
            &answer(q.id, vec![], Some("Because addition is commutative")),
        )
        .await;
        assert_eq!(result.score, 8);
        assert_eq!(result.feedback, "Good reasoning, minor gaps.");
    }

    #[tokio::test]
    async fn short_answer_failure_degrades_to_zero_with_error_feedback() {
        let q = question(QuestionType::ShortAnswer, 8);
        let result = Grader::grade(
            &FailingGenerator,
            &q,
            &[],
            &answer(q.id, vec![], Some("an answer")),
        )
        .await;
        assert_eq!(result.score, 0);
        assert!(result.feedback.starts_with("Error evaluating answer:"));
    }

    #[tokio::test]
    async fn programming_failure_degrades_to_zero() {
        let q = question(QuestionType::Programming, 20);
        let result = Grader::grade(
            &FailingGenerator,
            &q,
            &[],
            &answer(q.id, vec![], Some("fn main() {}")),
        )
        .await;
        assert_eq!(result.score, 0);
        assert!(result.feedback.starts_with("Error reviewing code:"));
    }
}
