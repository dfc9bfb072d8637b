use crate::services::advisor_service::CourseBrief;
use crate::services::ai_service::{ChatPrompt, TextGenerator};
use serde::Serialize;
use uuid::Uuid;

/// Canned reply used whenever the assistant call fails.
pub const CHAT_FALLBACK: &str =
    "I apologize, but I'm having trouble processing your request. Please try again later.";

const FALLBACK_TROUBLESHOOTING_STEP: &str =
    "Please try refreshing the page or clearing your browser cache.";

const TECHNICAL_KEYWORDS: &[&str] = &["error", "problem", "issue", "bug", "not working", "broken"];
const COURSE_KEYWORDS: &[&str] = &["course", "class", "lesson", "learn", "study", "training"];

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourseSummary {
    pub id: Uuid,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    pub activity_type: String,
    pub course: String,
    pub score: Option<i32>,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ChatContext {
    pub enrolled_courses: Vec<EnrolledCourseSummary>,
    pub interests: Vec<String>,
    pub recent_activity: Vec<RecentActivity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub is_technical_issue: bool,
    pub is_course_query: bool,
    pub suggested_courses: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub troubleshooting_steps: Option<Vec<String>>,
}

pub fn is_technical_issue(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TECHNICAL_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

pub fn is_course_query(message: &str) -> bool {
    let lowered = message.to_lowercase();
    COURSE_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Answer a chat message with user and catalog context. Best-effort: a
/// failed assistant call produces the canned apology with all flags down.
pub async fn process_message<G: TextGenerator>(
    gen: &G,
    message: &str,
    user_context: Option<&ChatContext>,
    courses: &[CourseBrief],
) -> ChatReply {
    let context_json = user_context
        .map(|ctx| serde_json::to_string_pretty(ctx).unwrap_or_else(|_| "{}".to_string()))
        .unwrap_or_else(|| "{}".to_string());
    let courses_json =
        serde_json::to_string_pretty(courses).unwrap_or_else(|_| "[]".to_string());

    let prompt = format!(
        "You are an AI assistant for an educational platform. Help users with \
         their questions about courses and learning.\n\n\
         User Context:\n{}\n\n\
         Available Courses:\n{}\n\n\
         User Message: {}\n\n\
         Provide a helpful response that:\n\
         1. Directly addresses the user's question\n\
         2. Uses available context to personalise the response\n\
         3. Suggests relevant courses if appropriate\n\
         4. Offers troubleshooting steps if they mention technical issues",
        context_json, courses_json, message,
    );

    let response = match gen
        .generate(ChatPrompt {
            system: "You are a helpful educational assistant.",
            user: prompt,
            temperature: 0.7,
            max_tokens: 500,
        })
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = ?e, "Chat completion failed");
            return ChatReply {
                response: CHAT_FALLBACK.to_string(),
                is_technical_issue: false,
                is_course_query: false,
                suggested_courses: Vec::new(),
                troubleshooting_steps: None,
            };
        }
    };

    let technical = is_technical_issue(message);
    let troubleshooting = if technical {
        Some(troubleshooting_steps(gen, message).await)
    } else {
        None
    };

    ChatReply {
        response,
        is_technical_issue: technical,
        is_course_query: is_course_query(message),
        suggested_courses: Vec::new(),
        troubleshooting_steps: troubleshooting,
    }
}

/// Fetch step-by-step help for a reported issue; degrades to one generic
/// step.
pub async fn troubleshooting_steps<G: TextGenerator>(gen: &G, issue: &str) -> Vec<String> {
    let prompt = format!(
        "Provide specific troubleshooting steps for this issue: {}\n\n\
         Include:\n\
         1. Common causes\n\
         2. Step-by-step solutions\n\
         3. When to contact support",
        issue,
    );

    match gen
        .generate(ChatPrompt {
            system: "You are a technical support expert.",
            user: prompt,
            temperature: 0.3,
            max_tokens: 300,
        })
        .await
    {
        Ok(text) => text
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        Err(_) => vec![FALLBACK_TROUBLESHOOTING_STEP.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::testing::{FailingGenerator, StaticGenerator};

    #[test]
    fn keyword_flags_are_case_insensitive() {
        assert!(is_technical_issue("The player is BROKEN again"));
        assert!(!is_technical_issue("When does enrollment open?"));
        assert!(is_course_query("Which COURSE should I take next?"));
        assert!(!is_course_query("hello"));
    }

    #[tokio::test]
    async fn reply_carries_flags_and_troubleshooting_steps() {
        let reply = process_message(
            &StaticGenerator("Step 1: reload.\nStep 2: log in again."),
            "The video player shows an error during my lesson",
            None,
            &[],
        )
        .await;

        assert!(reply.is_technical_issue);
        assert!(reply.is_course_query);
        let steps = reply.troubleshooting_steps.unwrap();
        assert_eq!(steps.len(), 2);
    }

    #[tokio::test]
    async fn failed_completion_returns_the_apology() {
        let reply = process_message(&FailingGenerator, "anything at all", None, &[]).await;
        assert_eq!(reply.response, CHAT_FALLBACK);
        assert!(!reply.is_technical_issue);
        assert!(reply.troubleshooting_steps.is_none());
    }

    #[tokio::test]
    async fn troubleshooting_degrades_to_generic_step() {
        let steps = troubleshooting_steps(&FailingGenerator, "upload fails").await;
        assert_eq!(steps, vec![FALLBACK_TROUBLESHOOTING_STEP.to_string()]);
    }
}
