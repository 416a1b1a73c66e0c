use uuid::Uuid;

/// Outcome of checking an activation key. Every failure maps to one of a
/// small set of enumerable reasons; nothing about storage internals leaks
/// through the unauthenticated validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValidation {
    Valid { user_id: Uuid },
    Invalid { reason: RejectReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MalformedKey,
    KeyNotFound,
    KeyRevoked,
    NoSubscription,
    SubscriptionInactive,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MalformedKey => "Invalid key format",
            RejectReason::KeyNotFound => "Key not found",
            RejectReason::KeyRevoked => "Key has been revoked",
            RejectReason::NoSubscription => "No subscription found",
            RejectReason::SubscriptionInactive => "Subscription not active",
        }
    }
}
