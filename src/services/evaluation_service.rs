use crate::models::question::QuestionWithChoices;
use crate::models::submission::QuestionSubmission;
use crate::models::test::Test;
use crate::services::ai_service::{ChatPrompt, TextGenerator};
use crate::services::grading_service::{GradeResult, Grader};
use uuid::Uuid;

/// Substituted when the feedback-generation call fails; per-question results
/// are unaffected.
pub const FEEDBACK_FALLBACK: &str =
    "We're sorry, detailed feedback could not be generated for this attempt. \
     Your per-question results are still available.";

/// Per-question outcome. `question_submission_id` is `None` for questions the
/// learner never answered; those still contribute zero to the total.
#[derive(Debug, Clone)]
pub struct QuestionGrade {
    pub question_id: Uuid,
    pub question_submission_id: Option<Uuid>,
    pub score: i32,
    pub feedback: String,
}

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub score: i32,
    pub passed: bool,
    pub feedback: String,
    pub normalized_score: f64,
    pub question_grades: Vec<QuestionGrade>,
}

pub struct Evaluator;

impl Evaluator {
    /// Evaluate a full submission in memory: grade every question of the test
    /// in stored order, aggregate, and produce the overall feedback. The
    /// caller persists the outcome afterwards in a single transaction; this
    /// function performs no writes.
    pub async fn evaluate<G: TextGenerator>(
        gen: &G,
        test: &Test,
        questions: &[QuestionWithChoices],
        answers: &[QuestionSubmission],
    ) -> EvaluationOutcome {
        let max_score: i32 = questions.iter().map(|q| q.question.points).sum();

        let mut total_score = 0;
        let mut question_grades = Vec::with_capacity(questions.len());
        let mut feedback_lines = Vec::with_capacity(questions.len());

        for (idx, bundle) in questions.iter().enumerate() {
            let question = &bundle.question;
            let answer = answers.iter().find(|a| a.question_id == question.id);

            let (question_submission_id, result) = match answer {
                Some(a) => (
                    Some(a.id),
                    Grader::grade(gen, question, &bundle.choices, a).await,
                ),
                // Unanswered questions score an explicit zero; they still
                // count towards max_score below.
                None => (
                    None,
                    GradeResult {
                        score: 0,
                        feedback: "No answer submitted.".to_string(),
                    },
                ),
            };

            total_score += result.score;
            feedback_lines.push(format!("Question {}: {}", idx + 1, result.feedback));
            question_grades.push(QuestionGrade {
                question_id: question.id,
                question_submission_id,
                score: result.score,
                feedback: result.feedback,
            });
        }

        // A test without questions must not divide by zero: it grades to
        // zero and never passes.
        let (score, passed, normalized_score) = if max_score > 0 {
            let ratio = total_score as f64 / max_score as f64;
            let final_score = (ratio * test.max_score as f64).round() as i32;
            (final_score, final_score >= test.passing_score, ratio)
        } else {
            (0, false, 0.0)
        };

        let feedback = Self::overall_feedback(gen, test, score, passed, &feedback_lines).await;

        EvaluationOutcome {
            score,
            passed,
            feedback,
            normalized_score,
            question_grades,
        }
    }

    async fn overall_feedback<G: TextGenerator>(
        gen: &G,
        test: &Test,
        score: i32,
        passed: bool,
        feedback_lines: &[String],
    ) -> String {
        let prompt = format!(
            "Generate overall feedback for this test submission:\n\n\
             Test: {}\n\
             Score: {}/{}\n\
             Passed: {}\n\
             Question Feedback:\n{}\n\n\
             Provide:\n\
             1. Overall performance summary\n\
             2. Key strengths and areas for improvement\n\
             3. Study recommendations",
            test.title,
            score,
            test.max_score,
            if passed { "Yes" } else { "No" },
            feedback_lines.join("\n"),
        );

        match gen
            .generate(ChatPrompt {
                system: "You are an educational feedback system.",
                user: prompt,
                temperature: 0.7,
                max_tokens: 300,
            })
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = ?e, "Overall feedback generation failed");
                FEEDBACK_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::choice::Choice;
    use crate::models::question::{Question, QuestionType};
    use crate::models::test::TestType;
    use crate::services::ai_service::testing::{FailingGenerator, StaticGenerator};
    use chrono::Utc;

    fn test_entity(max_score: i32, passing_score: i32) -> Test {
        Test {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Algebra basics".to_string(),
            description: None,
            test_type: TestType::Quiz,
            max_score,
            passing_score,
            time_limit_minutes: None,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn question(test_id: Uuid, question_type: QuestionType, points: i32, position: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            test_id,
            question_type,
            question_text: format!("Question #{}", position),
            points,
            position,
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

    fn answer(question_id: Uuid, selected: Vec<Uuid>) -> QuestionSubmission {
        QuestionSubmission {
            id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            question_id,
            answer_text: None,
            selected_choice_ids: selected,
            score: None,
            ai_feedback: None,
        }
    }

    /// One correct multiple-choice, one wrong true/false, both worth 5:
    /// half the raw points scale to 50/100, which meets the inclusive
    /// passing threshold of 50.
    #[tokio::test]
    async fn half_right_submission_passes_at_inclusive_threshold() {
        let test = test_entity(100, 50);

        let mcq = question(test.id, QuestionType::MultipleChoice, 5, 1);
        let mcq_choices = vec![choice(mcq.id, "4", true), choice(mcq.id, "5", false)];
        let tf = question(test.id, QuestionType::TrueFalse, 5, 2);
        let tf_choices = vec![choice(tf.id, "True", true), choice(tf.id, "False", false)];

        let questions = vec![
            QuestionWithChoices {
                question: mcq.clone(),
                choices: mcq_choices.clone(),
            },
            QuestionWithChoices {
                question: tf.clone(),
                choices: tf_choices.clone(),
            },
        ];
        let answers = vec![
            answer(mcq.id, vec![mcq_choices[0].id]),
            answer(tf.id, vec![tf_choices[1].id]),
        ];

        let outcome =
            Evaluator::evaluate(&StaticGenerator("Solid effort."), &test, &questions, &answers)
                .await;

        assert_eq!(outcome.score, 50);
        assert!(outcome.passed);
        assert!((outcome.normalized_score - 0.5).abs() < f64::EPSILON);
        assert_eq!(outcome.feedback, "Solid effort.");
    }

    #[tokio::test]
    async fn aggregation_matches_ratio_of_summed_points() {
        let test = test_entity(100, 70);

        let q1 = question(test.id, QuestionType::MultipleChoice, 3, 1);
        let q1_choices = vec![choice(q1.id, "a", true), choice(q1.id, "b", false)];
        let q2 = question(test.id, QuestionType::MultipleChoice, 7, 2);
        let q2_choices = vec![choice(q2.id, "c", true), choice(q2.id, "d", false)];

        let questions = vec![
            QuestionWithChoices {
                question: q1.clone(),
                choices: q1_choices.clone(),
            },
            QuestionWithChoices {
                question: q2.clone(),
                choices: q2_choices.clone(),
            },
        ];
        // 3 of 10 raw points.
        let answers = vec![
            answer(q1.id, vec![q1_choices[0].id]),
            answer(q2.id, vec![q2_choices[1].id]),
        ];

        let outcome = Evaluator::evaluate(&StaticGenerator("ok"), &test, &questions, &answers).await;

        assert_eq!(outcome.score, (3.0_f64 / 10.0 * 100.0).round() as i32);
        assert!(!outcome.passed);
    }

    #[tokio::test]
    async fn unanswered_questions_score_explicit_zero_and_depress_the_ratio() {
        let test = test_entity(100, 50);

        let q1 = question(test.id, QuestionType::MultipleChoice, 5, 1);
        let q1_choices = vec![choice(q1.id, "a", true), choice(q1.id, "b", false)];
        let q2 = question(test.id, QuestionType::MultipleChoice, 5, 2);
        let q2_choices = vec![choice(q2.id, "c", true), choice(q2.id, "d", false)];

        let questions = vec![
            QuestionWithChoices {
                question: q1.clone(),
                choices: q1_choices.clone(),
            },
            QuestionWithChoices {
                question: q2.clone(),
                choices: q2_choices,
            },
        ];
        // Only the first question is answered.
        let answers = vec![answer(q1.id, vec![q1_choices[0].id])];

        let outcome = Evaluator::evaluate(&StaticGenerator("ok"), &test, &questions, &answers).await;

        assert_eq!(outcome.score, 50);
        assert_eq!(outcome.question_grades.len(), 2);
        let missing = &outcome.question_grades[1];
        assert_eq!(missing.question_submission_id, None);
        assert_eq!(missing.score, 0);
        assert_eq!(missing.feedback, "No answer submitted.");
    }

    #[tokio::test]
    async fn zero_question_test_grades_to_zero_without_dividing() {
        let test = test_entity(100, 0);

        let outcome = Evaluator::evaluate(&StaticGenerator("ok"), &test, &[], &[]).await;

        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
        assert_eq!(outcome.normalized_score, 0.0);
    }

    #[tokio::test]
    async fn generator_failure_still_produces_a_complete_outcome() {
        let test = test_entity(100, 50);

        let sa = question(test.id, QuestionType::ShortAnswer, 10, 1);
        let questions = vec![QuestionWithChoices {
            question: sa.clone(),
            choices: vec![],
        }];
        let mut free_text = answer(sa.id, vec![]);
        free_text.answer_text = Some("my essay".to_string());

        let outcome = Evaluator::evaluate(&FailingGenerator, &test, &questions, &[free_text]).await;

        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
        assert_eq!(outcome.feedback, FEEDBACK_FALLBACK);
        assert!(outcome.question_grades[0]
            .feedback
            .starts_with("Error evaluating answer:"));
    }
}
