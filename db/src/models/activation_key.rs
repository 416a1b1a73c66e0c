use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivationKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key: String,
    pub issued_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub client_public_key: Option<String>,
    pub client_ip: Option<String>,
    pub last_connected: Option<DateTime<Utc>>,
}

/// Activation key joined with the owning user's subscription state, as read
/// by the validation path. Subscription columns are null when the user has
/// no subscription row at all.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivationKeyWithSubscription {
    pub user_id: Uuid,
    pub revoked_at: Option<DateTime<Utc>>,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}
