use academy_backend::error::{Error, Result};
use academy_backend::models::choice::Choice;
use academy_backend::models::question::{Question, QuestionType, QuestionWithChoices};
use academy_backend::models::reward::RewardType;
use academy_backend::models::submission::{QuestionSubmission, SubmissionStatus, TestSubmission};
use academy_backend::models::test::{Test, TestType};
use academy_backend::services::ai_service::{ChatPrompt, TextGenerator};
use academy_backend::services::evaluation_service::Evaluator;
use academy_backend::services::reward_service::derive_rewards;
use chrono::Utc;
use uuid::Uuid;

struct CannedGenerator(&'static str);

impl TextGenerator for CannedGenerator {
    async fn generate(&self, _prompt: ChatPrompt<'_>) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct TimedOutGenerator;

impl TextGenerator for TimedOutGenerator {
    async fn generate(&self, _prompt: ChatPrompt<'_>) -> Result<String> {
        Err(Error::Internal("operation timed out".to_string()))
    }
}

fn quiz(max_score: i32, passing_score: i32) -> Test {
    Test {
        id: Uuid::new_v4(),
        course_id: Uuid::new_v4(),
        title: "Course checkpoint".to_string(),
        description: None,
        test_type: TestType::Quiz,
        max_score,
        passing_score,
        time_limit_minutes: Some(30),
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
        question_text: format!("Question {}", position),
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

fn answer(
    submission_id: Uuid,
    question_id: Uuid,
    selected: Vec<Uuid>,
    text: Option<&str>,
) -> QuestionSubmission {
    QuestionSubmission {
        id: Uuid::new_v4(),
        submission_id,
        question_id,
        answer_text: text.map(str::to_string),
        selected_choice_ids: selected,
        score: None,
        ai_feedback: None,
    }
}

fn submission_from(test: &Test, score: i32, passed: bool) -> TestSubmission {
    TestSubmission {
        id: Uuid::new_v4(),
        test_id: test.id,
        user_id: Uuid::new_v4(),
        score: Some(score),
        status: if passed {
            SubmissionStatus::Graded
        } else {
            SubmissionStatus::Failed
        },
        submitted_at: Utc::now(),
        graded_at: Some(Utc::now()),
        ai_feedback: None,
        ai_score: None,
    }
}

/// A half-right two-question quiz lands exactly on the passing threshold:
/// the submission passes, earns 500 points and a certificate, but no badge.
#[tokio::test]
async fn boundary_submission_passes_and_earns_points_plus_certificate() {
    let test = quiz(100, 50);
    let submission_id = Uuid::new_v4();

    let mcq = question(test.id, QuestionType::MultipleChoice, 5, 1);
    let mcq_choices = vec![
        choice(mcq.id, "Right", true),
        choice(mcq.id, "Wrong", false),
    ];
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
        answer(submission_id, mcq.id, vec![mcq_choices[0].id], None),
        answer(submission_id, tf.id, vec![tf_choices[1].id], None),
    ];

    let outcome = Evaluator::evaluate(&CannedGenerator("Keep going!"), &test, &questions, &answers).await;

    assert_eq!(outcome.score, 50);
    assert!(outcome.passed);
    assert_eq!(outcome.question_grades.len(), 2);
    assert_eq!(outcome.question_grades[0].score, 5);
    assert_eq!(outcome.question_grades[1].score, 0);

    let graded = submission_from(&test, outcome.score, outcome.passed);
    let rewards = derive_rewards(&graded);

    let types: Vec<RewardType> = rewards.iter().map(|r| r.reward_type).collect();
    assert_eq!(types, vec![RewardType::Points, RewardType::Certificate]);
    assert_eq!(rewards[0].reward_value, "500");
    assert!(rewards[1].reward_value.ends_with(".pdf"));
}

/// A text-generation outage while grading a free-text question must not
/// abort the evaluation: the question scores zero, the overall feedback is
/// the static fallback, and reward issuance still works on the failed
/// submission.
#[tokio::test]
async fn generator_outage_degrades_but_completes_the_pipeline() {
    let test = quiz(100, 70);
    let submission_id = Uuid::new_v4();

    let essay = question(test.id, QuestionType::ShortAnswer, 10, 1);
    let questions = vec![QuestionWithChoices {
        question: essay.clone(),
        choices: vec![choice(essay.id, "Expected answer", true)],
    }];
    let answers = vec![answer(
        submission_id,
        essay.id,
        vec![],
        Some("My long-form answer"),
    )];

    let outcome = Evaluator::evaluate(&TimedOutGenerator, &test, &questions, &answers).await;

    assert_eq!(outcome.score, 0);
    assert!(!outcome.passed);
    assert!(outcome.question_grades[0]
        .feedback
        .starts_with("Error evaluating answer:"));

    let failed = submission_from(&test, outcome.score, outcome.passed);
    let rewards = derive_rewards(&failed);
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].reward_type, RewardType::Points);
    assert_eq!(rewards[0].reward_value, "0");
}

/// High scorers collect the excellence badge on top of points and the
/// certificate.
#[tokio::test]
async fn excellent_submission_earns_all_three_reward_kinds() {
    let test = quiz(100, 70);
    let submission_id = Uuid::new_v4();

    let mcq = question(test.id, QuestionType::MultipleChoice, 10, 1);
    let mcq_choices = vec![choice(mcq.id, "Yes", true), choice(mcq.id, "No", false)];
    let questions = vec![QuestionWithChoices {
        question: mcq.clone(),
        choices: mcq_choices.clone(),
    }];
    let answers = vec![answer(submission_id, mcq.id, vec![mcq_choices[0].id], None)];

    let outcome =
        Evaluator::evaluate(&CannedGenerator("Flawless."), &test, &questions, &answers).await;

    assert_eq!(outcome.score, 100);
    assert!(outcome.passed);

    let graded = submission_from(&test, outcome.score, outcome.passed);
    let types: Vec<RewardType> = derive_rewards(&graded)
        .iter()
        .map(|r| r.reward_type)
        .collect();
    assert_eq!(
        types,
        vec![RewardType::Points, RewardType::Badge, RewardType::Certificate]
    );
}
