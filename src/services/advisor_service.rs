use crate::error::Result;
use crate::services::ai_service::{ChatPrompt, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Returned whenever the fraud signal cannot be obtained or parsed.
pub const DEFAULT_FRAUD_SCORE: f64 = 0.5;

const MAX_RECOMMENDATIONS: usize = 5;
const FALLBACK_RELEVANCE: f64 = 0.8;

/// Minimal course surface handed to the text generator.
#[derive(Debug, Clone, Serialize)]
pub struct CourseBrief {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct HistoryEntry {
    pub course_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct LearnerProfile {
    pub interests: Vec<String>,
    pub average_score: f64,
    pub completed_courses: i64,
    pub learning_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseRecommendation {
    pub course_id: Uuid,
    pub course_title: String,
    pub relevance_score: f64,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    course_id: Uuid,
    relevance_score: f64,
    explanation: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DiscountRecommendation {
    pub recommended_discount: f64,
    pub bonus_points: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountContext {
    pub interests: Vec<String>,
    pub enrolled_course_titles: Vec<String>,
    pub payment_amounts: Vec<String>,
    pub course_title: String,
    pub course_price: String,
    pub course_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifficultyAdjustment {
    pub difficulty: String,
    #[serde(default)]
    pub practice_recommendations: Vec<String>,
    #[serde(default)]
    pub prerequisites_to_review: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentScore {
    pub test: String,
    pub score: i32,
}

/// Rank courses for a learner. Best-effort: any generation or parse failure
/// falls back to the supplied popular-courses list (empty when there is
/// nothing popular), never to an error.
pub async fn recommend_courses<G: TextGenerator>(
    gen: &G,
    profile: &LearnerProfile,
    available: &[CourseBrief],
    popular: &[CourseBrief],
) -> Vec<CourseRecommendation> {
    match try_recommend(gen, profile, available).await {
        Ok(recommendations) => recommendations,
        Err(e) => {
            tracing::warn!(error = ?e, "Course recommendation failed, using popular fallback");
            popular
                .iter()
                .take(MAX_RECOMMENDATIONS)
                .map(|course| CourseRecommendation {
                    course_id: course.id,
                    course_title: course.title.clone(),
                    relevance_score: FALLBACK_RELEVANCE,
                    explanation: "Popular with other learners".to_string(),
                })
                .collect()
        }
    }
}

async fn try_recommend<G: TextGenerator>(
    gen: &G,
    profile: &LearnerProfile,
    available: &[CourseBrief],
) -> Result<Vec<CourseRecommendation>> {
    let prompt = format!(
        "Based on the following user data, recommend suitable courses:\n\n\
         User Performance:\n\
         - Average Score: {:.1}%\n\
         - Completed Courses: {}\n\
         - Interests: {}\n\n\
         Learning History:\n{}\n\n\
         Available Courses:\n{}\n\n\
         Recommend the top {} most relevant courses. Respond with a JSON array \
         of objects containing:\n\
         - course_id: the ID of the course\n\
         - relevance_score: a score from 0-1 indicating relevance\n\
         - explanation: a brief explanation of why this course is relevant",
        profile.average_score,
        profile.completed_courses,
        profile.interests.join(", "),
        serde_json::to_string_pretty(&profile.learning_history)?,
        serde_json::to_string_pretty(available)?,
        MAX_RECOMMENDATIONS,
    );

    let response = gen
        .generate(ChatPrompt {
            system: "You are a course recommendation system.",
            user: prompt,
            temperature: 0.7,
            max_tokens: 500,
        })
        .await?;

    parse_recommendations(&response, available)
}

/// Strict parse of the model output: a JSON array (bare, or under a
/// `recommendations` key). Unknown course ids are dropped, relevance is
/// clamped into [0, 1]; a malformed document or item fails the whole parse.
fn parse_recommendations(
    raw: &str,
    available: &[CourseBrief],
) -> Result<Vec<CourseRecommendation>> {
    let value: JsonValue = serde_json::from_str(raw.trim())?;
    let items = value
        .as_array()
        .cloned()
        .or_else(|| {
            value
                .get("recommendations")
                .and_then(|v| v.as_array())
                .cloned()
        })
        .ok_or_else(|| anyhow::anyhow!("Recommendation response is not an array"))?;

    let mut recommendations = Vec::new();
    for item in items {
        let raw_item: RawRecommendation = serde_json::from_value(item)?;
        if let Some(course) = available.iter().find(|c| c.id == raw_item.course_id) {
            recommendations.push(CourseRecommendation {
                course_id: raw_item.course_id,
                course_title: course.title.clone(),
                relevance_score: raw_item.relevance_score.clamp(0.0, 1.0),
                explanation: raw_item.explanation,
            });
        }
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);
    Ok(recommendations)
}

/// Score payment data for fraud risk in [0, 1]. Best-effort: any failure
/// yields [`DEFAULT_FRAUD_SCORE`] (medium risk).
pub async fn fraud_score<G: TextGenerator>(gen: &G, payment_data: &JsonValue) -> f64 {
    let prompt = format!(
        "Analyze this payment data for potential fraud:\n{}\n\n\
         Consider:\n\
         1. Payment amount and frequency\n\
         2. User's payment history\n\
         3. Device and location information\n\
         4. Transaction patterns\n\n\
         Return a fraud score between 0 and 1, where:\n\
         0 = Very safe\n\
         1 = Highly suspicious",
        payment_data,
    );

    let outcome = match gen
        .generate(ChatPrompt {
            system: "You are a payment fraud detection system.",
            user: prompt,
            temperature: 0.3,
            max_tokens: 100,
        })
        .await
    {
        Ok(response) => parse_fraud_score(&response),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(score) => score.clamp(0.0, 1.0),
        Err(e) => {
            tracing::warn!(error = ?e, "Fraud analysis failed, defaulting to medium risk");
            DEFAULT_FRAUD_SCORE
        }
    }
}

fn parse_fraud_score(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if let Ok(score) = trimmed.parse::<f64>() {
        return Ok(score);
    }

    let value: JsonValue = serde_json::from_str(trimmed)?;
    value
        .as_f64()
        .or_else(|| value.get("fraud_score").and_then(|v| v.as_f64()))
        .or_else(|| value.get("score").and_then(|v| v.as_f64()))
        .ok_or_else(|| anyhow::anyhow!("Fraud response carries no numeric score").into())
}

/// Recommend a discount for a user buying a course. Best-effort: `None`
/// (no discount) on any failure.
pub async fn recommend_discount<G: TextGenerator>(
    gen: &G,
    context: &DiscountContext,
) -> Option<DiscountRecommendation> {
    let result = try_recommend_discount(gen, context).await;
    match result {
        Ok(recommendation) => Some(recommendation),
        Err(e) => {
            tracing::warn!(error = ?e, "Discount recommendation failed, applying none");
            None
        }
    }
}

async fn try_recommend_discount<G: TextGenerator>(
    gen: &G,
    context: &DiscountContext,
) -> Result<DiscountRecommendation> {
    let prompt = format!(
        "Analyze this user's data to recommend a discount:\n\n\
         User Information:\n\
         - Interests: {}\n\
         - Learning History: {}\n\
         - Payment History: {}\n\n\
         Course Information:\n\
         - Title: {}\n\
         - Price: {}\n\
         - Category: {}\n\n\
         Consider:\n\
         1. User's engagement level\n\
         2. Course relevance to user's interests\n\
         3. Payment history and loyalty\n\
         4. Course popularity and pricing\n\n\
         Return a JSON object with:\n\
         - recommended_discount: percentage (0-100)\n\
         - bonus_points: integer\n\
         - reason: explanation string",
        context.interests.join(", "),
        context.enrolled_course_titles.join(", "),
        context.payment_amounts.join(", "),
        context.course_title,
        context.course_price,
        context.course_category,
    );

    let response = gen
        .generate(ChatPrompt {
            system: "You are a discount recommendation system.",
            user: prompt,
            temperature: 0.7,
            max_tokens: 200,
        })
        .await?;

    let mut recommendation: DiscountRecommendation = serde_json::from_str(response.trim())?;
    recommendation.recommended_discount = recommendation.recommended_discount.clamp(0.0, 100.0);
    Ok(recommendation)
}

/// Suggest a difficulty adjustment from recent scores. Best-effort: keeps
/// the current level with no suggestions on any failure.
pub async fn adjust_difficulty<G: TextGenerator>(
    gen: &G,
    course_title: &str,
    current_level: &str,
    average_score: f64,
    recent_scores: &[RecentScore],
) -> DifficultyAdjustment {
    let result = try_adjust_difficulty(gen, course_title, current_level, average_score, recent_scores)
        .await;
    match result {
        Ok(adjustment) => adjustment,
        Err(e) => {
            tracing::warn!(error = ?e, "Difficulty adjustment failed, keeping current level");
            DifficultyAdjustment {
                difficulty: current_level.to_string(),
                practice_recommendations: Vec::new(),
                prerequisites_to_review: Vec::new(),
            }
        }
    }
}

async fn try_adjust_difficulty<G: TextGenerator>(
    gen: &G,
    course_title: &str,
    current_level: &str,
    average_score: f64,
    recent_scores: &[RecentScore],
) -> Result<DifficultyAdjustment> {
    let prompt = format!(
        "Based on the user's performance, suggest appropriate difficulty adjustments:\n\n\
         Course: {}\n\
         Current Level: {}\n\
         Average Score: {:.1}%\n\n\
         Recent Test Scores:\n{}\n\n\
         Return a JSON object with:\n\
         - difficulty: suggested difficulty level\n\
         - practice_recommendations: array of additional practice suggestions\n\
         - prerequisites_to_review: array of prerequisites to review",
        course_title,
        current_level,
        average_score,
        serde_json::to_string_pretty(recent_scores)?,
    );

    let response = gen
        .generate(ChatPrompt {
            system: "You are an educational difficulty adjustment system.",
            user: prompt,
            temperature: 0.3,
            max_tokens: 500,
        })
        .await?;

    Ok(serde_json::from_str(response.trim())?)
}
