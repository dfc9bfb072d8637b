use crate::error::Result;
use crate::models::reward::{RewardType, UserReward};
use crate::models::submission::{SubmissionStatus, TestSubmission};
use sqlx::PgPool;
use uuid::Uuid;

pub const BADGE_EXCELLENT: &str = "Excellent Performance";
pub const BADGE_GREAT: &str = "Great Work";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReward {
    pub reward_type: RewardType,
    pub reward_value: String,
}

/// Derive the rewards a graded submission earns. Deterministic over the
/// submission's score and status: calling it twice with the same input
/// yields the same sequence. Returns nothing when the submission has no
/// score yet.
pub fn derive_rewards(submission: &TestSubmission) -> Vec<NewReward> {
    let Some(score) = submission.score else {
        return Vec::new();
    };

    // 10 points per percentage point.
    let mut rewards = vec![NewReward {
        reward_type: RewardType::Points,
        reward_value: (score * 10).to_string(),
    }];

    if score >= 90 {
        rewards.push(NewReward {
            reward_type: RewardType::Badge,
            reward_value: BADGE_EXCELLENT.to_string(),
        });
    } else if score >= 80 {
        rewards.push(NewReward {
            reward_type: RewardType::Badge,
            reward_value: BADGE_GREAT.to_string(),
        });
    }

    if submission.status == SubmissionStatus::Graded {
        rewards.push(NewReward {
            reward_type: RewardType::Certificate,
            reward_value: format!("/certificates/{}.pdf", submission.id),
        });
    }

    rewards
}

#[derive(Clone)]
pub struct RewardService {
    pool: PgPool,
}

impl RewardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist the derived rewards as append-only rows. Callers run this
    /// once per submission, right after the evaluator's terminal transition.
    pub async fn award(&self, submission: &TestSubmission) -> Result<Vec<UserReward>> {
        let mut awarded = Vec::new();
        for reward in derive_rewards(submission) {
            let row = sqlx::query_as::<_, UserReward>(
                r#"
                INSERT INTO user_rewards (user_id, submission_id, reward_type, reward_value)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(submission.user_id)
            .bind(submission.id)
            .bind(reward.reward_type)
            .bind(&reward.reward_value)
            .fetch_one(&self.pool)
            .await?;
            awarded.push(row);
        }
        Ok(awarded)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UserReward>> {
        let rewards = sqlx::query_as::<_, UserReward>(
            r#"
            SELECT * FROM user_rewards
            WHERE user_id = $1
            ORDER BY awarded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission(score: Option<i32>, status: SubmissionStatus) -> TestSubmission {
        TestSubmission {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            score,
            status,
            submitted_at: Utc::now(),
            graded_at: Some(Utc::now()),
            ai_feedback: None,
            ai_score: None,
        }
    }

    #[test]
    fn ungraded_submission_earns_nothing() {
        let sub = submission(None, SubmissionStatus::Pending);
        assert!(derive_rewards(&sub).is_empty());
    }

    #[test]
    fn passing_boundary_submission_earns_points_and_certificate_only() {
        let sub = submission(Some(50), SubmissionStatus::Graded);
        let rewards = derive_rewards(&sub);

        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].reward_type, RewardType::Points);
        assert_eq!(rewards[0].reward_value, "500");
        assert_eq!(rewards[1].reward_type, RewardType::Certificate);
        assert_eq!(rewards[1].reward_value, format!("/certificates/{}.pdf", sub.id));
    }

    #[test]
    fn badge_bands_are_mutually_exclusive() {
        let great = derive_rewards(&submission(Some(85), SubmissionStatus::Graded));
        let badges: Vec<_> = great
            .iter()
            .filter(|r| r.reward_type == RewardType::Badge)
            .collect();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].reward_value, BADGE_GREAT);

        let excellent = derive_rewards(&submission(Some(90), SubmissionStatus::Graded));
        let badges: Vec<_> = excellent
            .iter()
            .filter(|r| r.reward_type == RewardType::Badge)
            .collect();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].reward_value, BADGE_EXCELLENT);
    }

    #[test]
    fn failed_submission_gets_points_but_no_certificate() {
        let rewards = derive_rewards(&submission(Some(40), SubmissionStatus::Failed));
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].reward_type, RewardType::Points);
        assert_eq!(rewards[0].reward_value, "400");
    }

    #[test]
    fn derivation_is_idempotent_for_unchanged_input() {
        let sub = submission(Some(92), SubmissionStatus::Graded);
        assert_eq!(derive_rewards(&sub), derive_rewards(&sub));
    }
}
