use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_provider", rename_all = "snake_case")]
pub enum PaymentProvider {
    Click,
    Payme,
    Uzum,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub transaction_id: Option<String>,
    pub payment_data: Option<JsonValue>,
    pub fraud_score: Option<f64>,
    pub discount_applied: Option<Decimal>,
    pub bonus_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDiscount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discount_percentage: Decimal,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub ai_recommended: bool,
    pub recommendation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
