use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};
use sqlx::PgPool;

use crate::services;

/// Handles Stripe webhook events for subscription lifecycle transitions.
///
/// Called by Stripe's servers, never by the frontend. The signature header
/// is verified against the configured webhook secret before any event is
/// acted on. Subscription activation issues an activation key, deletion
/// revokes it, payment failure only downgrades the stored status.
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: actix_web::HttpRequest,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let signature = match req.headers().get("stripe-signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => return Err(AppError::BadRequest("Stripe signature missing".to_string())),
    };

    let event =
        services::pay::construct_event(&payload, signature, &config.stripe_webhook_secret)?;

    let client = common::stripe::create_client(&config.stripe_secret_key);
    services::pay::process_event(&pool, &client, event).await?;

    Success::ok("Webhook processed successfully")
}
