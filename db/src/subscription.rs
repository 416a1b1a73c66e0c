use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::subscription::Subscription;

pub async fn get_by_stripe_customer_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    stripe_customer_id: &str,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        "SELECT * FROM subscriptions WHERE stripe_customer_id = $1",
    )
    .bind(stripe_customer_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Marks the user's subscription active after a completed checkout,
/// creating the row if billing never touched this user before. Idempotent
/// under duplicate webhook delivery.
pub async fn activate<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    stripe_customer_id: &str,
    stripe_subscription_id: &str,
    current_period_end: Option<DateTime<Utc>>,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions
            (user_id, status, stripe_customer_id, stripe_subscription_id,
             current_period_end, cancel_at_period_end)
        VALUES ($1, 'active', $2, $3, $4, FALSE)
        ON CONFLICT (user_id)
        DO UPDATE SET status = 'active',
                      stripe_customer_id = EXCLUDED.stripe_customer_id,
                      stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                      current_period_end = EXCLUDED.current_period_end,
                      cancel_at_period_end = FALSE,
                      updated_at = now()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(stripe_customer_id)
    .bind(stripe_subscription_id)
    .bind(current_period_end)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Syncs status, period end and renewal flag from a billing update event.
pub async fn update_billing_state<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
    status: &str,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET status = $2, current_period_end = $3, cancel_at_period_end = $4,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(current_period_end)
    .bind(cancel_at_period_end)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn set_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
    status: &str,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        "UPDATE subscriptions SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Terminal transition once billing reports the subscription gone. The
/// Stripe reference is cleared; the row itself stays for the audit trail.
pub async fn mark_expired<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: Uuid,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET status = 'expired', stripe_subscription_id = NULL, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
