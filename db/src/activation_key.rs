use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::activation_key::{ActivationKey, ActivationKeyWithSubscription};

/// Checks key text against every stored key, revoked or not. Uniqueness is
/// required across the whole keyspace so a revoked key can never be
/// resurrected by a later issuance for a different user.
pub async fn key_exists<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key: &str,
) -> Res<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM activation_keys WHERE key = $1)")
        .bind(key)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

/// Atomic per-user upsert: creates the record on first issuance, otherwise
/// overwrites the key text, resets issued_at and clears any revocation.
/// Concurrent calls for the same user serialize on the unique user_id index;
/// the last writer wins and no half-updated state is observable.
pub async fn upsert_for_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    key: &str,
) -> Res<ActivationKey> {
    sqlx::query_as::<_, ActivationKey>(
        r#"
        INSERT INTO activation_keys (user_id, key)
        VALUES ($1, $2)
        ON CONFLICT (user_id)
        DO UPDATE SET key = EXCLUDED.key, issued_at = now(), revoked_at = NULL
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(key)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<ActivationKey>> {
    sqlx::query_as::<_, ActivationKey>("SELECT * FROM activation_keys WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Single read backing the validation path: the key row plus the owning
/// user's subscription state, if any.
pub async fn get_with_subscription_by_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key: &str,
) -> Res<Option<ActivationKeyWithSubscription>> {
    sqlx::query_as::<_, ActivationKeyWithSubscription>(
        r#"
        SELECT ak.user_id, ak.revoked_at,
               s.status AS subscription_status, s.current_period_end
        FROM activation_keys ak
        LEFT JOIN subscriptions s ON s.user_id = ak.user_id
        WHERE ak.key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Soft-revokes the user's key. Returns false when there is no key or it is
/// already revoked; that is a normal outcome, not an error.
pub async fn revoke_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<bool> {
    let result = sqlx::query(
        "UPDATE activation_keys SET revoked_at = now() WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(executor)
    .await
    .map_err(AppError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Administrative variant of `revoke_by_user_id`, addressed by key text.
pub async fn revoke_by_key<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key: &str,
) -> Res<bool> {
    let result = sqlx::query(
        "UPDATE activation_keys SET revoked_at = now() WHERE key = $1 AND revoked_at IS NULL",
    )
    .bind(key)
    .execute(executor)
    .await
    .map_err(AppError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Binds the client's WireGuard public key and allocated tunnel address to
/// the user's key record, returning the previously bound public key so the
/// caller can supersede the old gateway peer entry.
pub async fn bind_peer<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    client_public_key: &str,
    client_ip: &str,
) -> Res<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as(
        r#"
        WITH previous AS (
            SELECT client_public_key FROM activation_keys WHERE user_id = $1
        )
        UPDATE activation_keys
        SET client_public_key = $2, client_ip = $3, last_connected = now()
        WHERE user_id = $1
        RETURNING (SELECT client_public_key FROM previous)
        "#,
    )
    .bind(user_id)
    .bind(client_public_key)
    .bind(client_ip)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)?;

    match row {
        Some((previous,)) => Ok(previous),
        None => Err(AppError::NotFound(
            "No activation key on record for this user".to_string(),
        )),
    }
}
