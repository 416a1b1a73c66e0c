use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::PgPool;
use stripe::{
    CheckoutSession, Client, Event, EventObject, EventType, Expandable, Invoice, Subscription,
    Webhook,
};
use uuid::Uuid;

/// Verifies the webhook signature and deserializes the event.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    match Webhook::construct_event(payload, signature, webhook_secret) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::error!("Error constructing webhook event: {}", e);
            Err(AppError::BadRequest(format!("Webhook Error: {}", e)))
        }
    }
}

/// Routes a verified webhook event to its lifecycle handler.
pub async fn process_event(pool: &PgPool, client: &Client, event: Event) -> Res<()> {
    log::info!("Processing webhook event: {}", event.type_);

    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                handle_checkout_completed(pool, client, session).await?;
            }
        }
        EventType::CustomerSubscriptionUpdated => {
            if let EventObject::Subscription(subscription) = event.data.object {
                handle_subscription_updated(pool, subscription).await?;
            }
        }
        EventType::CustomerSubscriptionDeleted => {
            if let EventObject::Subscription(subscription) = event.data.object {
                handle_subscription_deleted(pool, subscription).await?;
            }
        }
        EventType::InvoicePaymentFailed => {
            if let EventObject::Invoice(invoice) = event.data.object {
                handle_payment_failed(pool, invoice).await?;
            }
        }
        _ => {
            log::debug!("Unhandled webhook event type: {}", event.type_);
        }
    }

    Ok(())
}

/// Subscription activated: sync the local subscription row and issue the
/// user's activation key. Duplicate deliveries re-run the same upserts.
async fn handle_checkout_completed(
    pool: &PgPool,
    client: &Client,
    session: CheckoutSession,
) -> Res<()> {
    let Some(user_id) = session
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get("user_id"))
        .and_then(|raw| Uuid::parse_str(raw).ok())
    else {
        log::warn!("Checkout session {} carries no usable user_id metadata", session.id);
        return Ok(());
    };

    let Some(subscription_id) = session.subscription.as_ref().map(|sub| match sub {
        Expandable::Id(id) => id.clone(),
        Expandable::Object(sub) => sub.id.clone(),
    }) else {
        log::warn!("Checkout session {} completed without a subscription", session.id);
        return Ok(());
    };

    if !db::user::exists_by_id(pool, user_id).await? {
        log::warn!("Checkout completed for unknown user {}", user_id);
        return Ok(());
    }

    let subscription = Subscription::retrieve(client, &subscription_id, &[])
        .await
        .map_err(AppError::from)?;

    let customer_id = expandable_customer_id(&subscription.customer);
    let current_period_end = period_end(subscription.current_period_end);

    db::subscription::activate(
        pool,
        user_id,
        &customer_id,
        subscription_id.as_str(),
        current_period_end,
    )
    .await?;

    provisioning::services::provision::issue_key(pool, user_id).await?;
    log::info!("Subscription activated and key issued for user {}", user_id);

    Ok(())
}

/// Billing reported a change: mirror status, period end and renewal flag.
/// An active subscription already flagged to cancel at period end is stored
/// as `canceled`; the access predicate keeps it valid until the period ends.
async fn handle_subscription_updated(pool: &PgPool, subscription: Subscription) -> Res<()> {
    let customer_id = expandable_customer_id(&subscription.customer);
    let Some(record) = db::subscription::get_by_stripe_customer_id(pool, &customer_id).await?
    else {
        log::warn!("Subscription update for unknown customer {}", customer_id);
        return Ok(());
    };

    let mut status = subscription.status.to_string();
    if status == "active" && subscription.cancel_at_period_end {
        status = "canceled".to_string();
    }

    db::subscription::update_billing_state(
        pool,
        record.id,
        &status,
        period_end(subscription.current_period_end),
        subscription.cancel_at_period_end,
    )
    .await?;

    Ok(())
}

/// Cancellation finalized: mark the subscription expired and revoke the key.
async fn handle_subscription_deleted(pool: &PgPool, subscription: Subscription) -> Res<()> {
    let customer_id = expandable_customer_id(&subscription.customer);
    let Some(record) = db::subscription::get_by_stripe_customer_id(pool, &customer_id).await?
    else {
        log::warn!("Subscription deletion for unknown customer {}", customer_id);
        return Ok(());
    };

    db::subscription::mark_expired(pool, record.id).await?;

    let revoked = provisioning::services::provision::revoke_key(pool, record.user_id).await?;
    if !revoked {
        log::info!("No active key to revoke for user {}", record.user_id);
    }

    Ok(())
}

/// Payment failure only downgrades the stored status; the key is untouched
/// and keeps granting access until billing finalizes the cancellation.
async fn handle_payment_failed(pool: &PgPool, invoice: Invoice) -> Res<()> {
    let Some(customer_id) = invoice.customer.as_ref().map(expandable_customer_id) else {
        log::warn!("Payment-failed invoice {} carries no customer", invoice.id);
        return Ok(());
    };

    let Some(record) = db::subscription::get_by_stripe_customer_id(pool, &customer_id).await?
    else {
        log::warn!("Payment failure for unknown customer {}", customer_id);
        return Ok(());
    };

    db::subscription::set_status(pool, record.id, "past_due").await?;
    log::info!("Subscription for user {} marked past_due", record.user_id);

    Ok(())
}

fn expandable_customer_id(customer: &Expandable<stripe::Customer>) -> String {
    match customer {
        Expandable::Id(id) => id.to_string(),
        Expandable::Object(customer) => customer.id.to_string(),
    }
}

fn period_end(timestamp: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
}
