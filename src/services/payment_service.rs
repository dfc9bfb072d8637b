use crate::error::{Error, Result};
use crate::models::course::Course;
use crate::models::payment::{Payment, PaymentProvider, PaymentStatus, UserDiscount};
use crate::models::user::User;
use crate::services::advisor_service::{self, DiscountContext};
use crate::services::ai_service::TextGenerator;
use crate::utils::token::generate_reference;
use chrono::{Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

const DISCOUNT_VALIDITY_DAYS: i64 = 7;
const TRANSACTION_REF_LEN: usize = 24;

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a payment for a course purchase. The advisor supplies a fraud
    /// signal and an optional discount; both are best-effort and can only
    /// shape the record, never block it.
    pub async fn create<G: TextGenerator>(
        &self,
        gen: &G,
        user: &User,
        course: &Course,
        provider: PaymentProvider,
        payment_data: JsonValue,
    ) -> Result<Payment> {
        let fraud_score = advisor_service::fraud_score(gen, &payment_data).await;

        let enrolled_course_titles = self.enrolled_course_titles(user.id).await?;
        let payment_amounts = self.payment_amounts(user.id).await?;
        let discount = advisor_service::recommend_discount(
            gen,
            &DiscountContext {
                interests: user.interest_list(),
                enrolled_course_titles,
                payment_amounts,
                course_title: course.title.clone(),
                course_price: course.price.to_string(),
                course_category: course.category.clone(),
            },
        )
        .await;

        let (amount, discount_applied, bonus_points) = match &discount {
            Some(rec) => {
                let percentage = Decimal::from_f64(rec.recommended_discount)
                    .unwrap_or(Decimal::ZERO)
                    .clamp(Decimal::ZERO, Decimal::from(100));
                let amount = (course.price
                    * (Decimal::ONE - percentage / Decimal::from(100)))
                .round_dp(2);
                (amount, Some(percentage), rec.bonus_points)
            }
            None => (course.price, None, 0),
        };

        let transaction_id = payment_data
            .get("transaction_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| generate_reference(TRANSACTION_REF_LEN));

        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                user_id, course_id, amount, currency, provider, transaction_id,
                payment_data, fraud_score, discount_applied, bonus_points
            ) VALUES ($1, $2, $3, 'USD', $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(course.id)
        .bind(amount)
        .bind(provider)
        .bind(&transaction_id)
        .bind(&payment_data)
        .bind(fraud_score)
        .bind(discount_applied)
        .bind(bonus_points)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO payment_attempts (payment_id, attempt_number, status) VALUES ($1, 1, 'initiated')"#,
        )
        .bind(payment.id)
        .execute(&mut *tx)
        .await?;

        if let Some(rec) = &discount {
            sqlx::query(
                r#"
                INSERT INTO user_discounts (
                    user_id, discount_percentage, valid_until, ai_recommended, recommendation_reason
                ) VALUES ($1, $2, $3, TRUE, $4)
                "#,
            )
            .bind(user.id)
            .bind(discount_applied.unwrap_or(Decimal::ZERO))
            .bind(Utc::now() + Duration::days(DISCOUNT_VALIDITY_DAYS))
            .bind(&rec.reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(payment)
    }

    /// Mark a payment completed and enroll the buyer.
    pub async fn confirm(&self, payment_id: Uuid, user_id: Uuid) -> Result<Payment> {
        let payment = self.get_owned(payment_id, user_id).await?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments SET status = 'completed', updated_at = NOW() WHERE id = $1 RETURNING *"#,
        )
        .bind(payment.id)
        .fetch_one(&mut *tx)
        .await?;

        self.record_attempt(&mut tx, payment.id, "completed", None)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.course_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn fail(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
        error_message: Option<String>,
    ) -> Result<Payment> {
        let payment = self.get_owned(payment_id, user_id).await?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments SET status = 'failed', updated_at = NOW() WHERE id = $1 RETURNING *"#,
        )
        .bind(payment.id)
        .fetch_one(&mut *tx)
        .await?;

        self.record_attempt(&mut tx, payment.id, "failed", error_message.as_deref())
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn active_discounts(&self, user_id: Uuid) -> Result<Vec<UserDiscount>> {
        let discounts = sqlx::query_as::<_, UserDiscount>(
            r#"
            SELECT * FROM user_discounts
            WHERE user_id = $1 AND is_active = TRUE AND valid_until > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(discounts)
    }

    async fn get_owned(&self, payment_id: Uuid, user_id: Uuid) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE id = $1 AND user_id = $2",
        )
        .bind(payment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Payment not found".to_string()))?;

        if payment.status == PaymentStatus::Refunded {
            return Err(Error::BadRequest(
                "Refunded payments can no longer change state".to_string(),
            ));
        }

        Ok(payment)
    }

    async fn record_attempt(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        payment_id: Uuid,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_attempts (payment_id, attempt_number, status, error_message)
            VALUES (
                $1,
                (SELECT COALESCE(MAX(attempt_number), 0) + 1 FROM payment_attempts WHERE payment_id = $1),
                $2,
                $3
            )
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .bind(error_message)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn enrolled_course_titles(&self, user_id: Uuid) -> Result<Vec<String>> {
        let titles: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT c.title FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = $1
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    async fn payment_amounts(&self, user_id: Uuid) -> Result<Vec<String>> {
        let amounts: Vec<Decimal> = sqlx::query_scalar(
            "SELECT amount FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(amounts.iter().map(Decimal::to_string).collect())
    }
}
