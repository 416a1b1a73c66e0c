use chrono::{DateTime, Utc};
use common::{
    error::{AppError, Res},
    key,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::validation::{KeyValidation, RejectReason};

/// Generation retries on key-text collision. With a 31-symbol alphabet and
/// 16 symbols the keyspace makes exhaustion astronomically unlikely, but it
/// still has to surface as a backend fault rather than be ignored.
const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Issues (or re-issues) the activation key for a user and returns the
/// plaintext key. The key is stored as-is: the product requires it to stay
/// visible to its owner on the dashboard, so it is a bearer credential kept
/// in plaintext by design.
///
/// Re-issuing for a user who already holds a key replaces the key text in
/// place and clears any revocation, so the previous key text stops
/// validating immediately. Safe under duplicate webhook delivery: the
/// per-user upsert never creates a second record.
pub async fn issue_key(pool: &PgPool, user_id: Uuid) -> Res<String> {
    let mut key_text = key::generate()?;

    let mut attempts = 1;
    while db::activation_key::key_exists(pool, &key_text).await? {
        if attempts >= MAX_GENERATION_ATTEMPTS {
            return Err(AppError::Internal(format!(
                "Failed to generate a unique activation key after {} attempts",
                MAX_GENERATION_ATTEMPTS
            )));
        }
        key_text = key::generate()?;
        attempts += 1;
    }

    db::activation_key::upsert_for_user(pool, user_id, &key_text).await?;
    log::info!("Activation key issued for user {}", user_id);

    Ok(key_text)
}

/// Validates an activation key for a connection attempt.
///
/// Fails closed at every step: unknown, revoked, subscription-less and
/// inactive-subscription keys are all rejected with an enumerable reason.
/// Read-only; called concurrently on every VPN connection attempt.
pub async fn validate_key(pool: &PgPool, raw_key: &str) -> Res<KeyValidation> {
    let key_text = key::normalize(raw_key);
    if !key::is_well_formed(&key_text) {
        return Ok(KeyValidation::Invalid {
            reason: RejectReason::MalformedKey,
        });
    }

    let Some(record) = db::activation_key::get_with_subscription_by_key(pool, &key_text).await?
    else {
        return Ok(KeyValidation::Invalid {
            reason: RejectReason::KeyNotFound,
        });
    };

    if record.revoked_at.is_some() {
        return Ok(KeyValidation::Invalid {
            reason: RejectReason::KeyRevoked,
        });
    }

    let Some(status) = record.subscription_status else {
        return Ok(KeyValidation::Invalid {
            reason: RejectReason::NoSubscription,
        });
    };

    if !grants_access(&status, record.current_period_end, Utc::now()) {
        return Ok(KeyValidation::Invalid {
            reason: RejectReason::SubscriptionInactive,
        });
    }

    Ok(KeyValidation::Valid {
        user_id: record.user_id,
    })
}

/// Revokes the user's key if one exists and is not already revoked.
/// Returns false when there was nothing to do.
pub async fn revoke_key(pool: &PgPool, user_id: Uuid) -> Res<bool> {
    let revoked = db::activation_key::revoke_by_user_id(pool, user_id).await?;
    if revoked {
        log::info!("Activation key revoked for user {}", user_id);
    }
    Ok(revoked)
}

/// Administrative path: same state transition as `revoke_key`, addressed by
/// the key text itself.
pub async fn revoke_key_by_text(pool: &PgPool, raw_key: &str) -> Res<bool> {
    let key_text = key::normalize(raw_key);
    if !key::is_well_formed(&key_text) {
        return Ok(false);
    }

    let revoked = db::activation_key::revoke_by_key(pool, &key_text).await?;
    if revoked {
        log::info!("Activation key revoked: {}", key_text);
    }
    Ok(revoked)
}

/// The access predicate consumed by validation.
///
/// `past_due` still grants access: payment failures get a grace period until
/// billing finalizes the cancellation. Deliberate policy, pending product
/// confirmation.
pub fn grants_access(
    status: &str,
    current_period_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match status {
        "active" | "past_due" => true,
        "canceled" => current_period_end.is_some_and(|end| now < end),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn active_subscription_grants_access() {
        let now = Utc::now();
        assert!(grants_access("active", None, now));
        assert!(grants_access("active", Some(now - Duration::days(3)), now));
    }

    #[test]
    fn canceled_subscription_grants_access_until_period_end() {
        let now = Utc::now();
        assert!(grants_access("canceled", Some(now + Duration::days(10)), now));
        assert!(!grants_access("canceled", Some(now - Duration::seconds(1)), now));
        assert!(!grants_access("canceled", None, now));
    }

    #[test]
    fn past_due_keeps_access_during_grace_period() {
        assert!(grants_access("past_due", None, Utc::now()));
    }

    #[test]
    fn terminal_statuses_deny_access() {
        let now = Utc::now();
        for status in ["expired", "inactive", "unpaid", ""] {
            assert!(!grants_access(status, Some(now + Duration::days(30)), now));
        }
    }

    #[test]
    fn reject_reasons_are_short_enumerable_strings() {
        assert_eq!(RejectReason::KeyRevoked.as_str(), "Key has been revoked");
        assert_eq!(
            RejectReason::SubscriptionInactive.as_str(),
            "Subscription not active"
        );
        assert_eq!(RejectReason::KeyNotFound.as_str(), "Key not found");
    }
}
