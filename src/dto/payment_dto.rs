use crate::models::payment::{Payment, PaymentProvider};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentPayload {
    pub course_id: Uuid,
    pub provider: PaymentProvider,
    pub payment_data: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct FailPaymentPayload {
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentCreatedResponse {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub provider: PaymentProvider,
    pub transaction_id: Option<String>,
    pub discount_applied: Option<Decimal>,
    pub bonus_points: i32,
}

impl From<Payment> for PaymentCreatedResponse {
    fn from(payment: Payment) -> Self {
        Self {
            payment_id: payment.id,
            amount: payment.amount,
            currency: payment.currency,
            provider: payment.provider,
            transaction_id: payment.transaction_id,
            discount_applied: payment.discount_applied,
            bonus_points: payment.bonus_points,
        }
    }
}
