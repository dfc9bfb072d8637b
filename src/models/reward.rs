use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reward_type", rename_all = "snake_case")]
pub enum RewardType {
    Points,
    Badge,
    Certificate,
}

/// Append-only record of recognition tied to a graded submission.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserReward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub submission_id: Uuid,
    pub reward_type: RewardType,
    pub reward_value: String,
    pub awarded_at: DateTime<Utc>,
}
