use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};
use provisioning::dtos::validation::KeyValidation;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::vpn::{
    RegisterRequest, RegisterResponse, RevokeRequest, ValidateRequest, ValidateResponse,
    VpnConnectionInfo,
};

/// Validates an activation key for the desktop client. A valid key also
/// gets the VPN connection descriptor; invalid keys get a 401 with one of
/// the enumerated reasons. Public and rate-limited upstream.
#[post("/validate")]
pub async fn post_validate(
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    req: web::Json<ValidateRequest>,
) -> Res<HttpResponse> {
    match provisioning::services::provision::validate_key(&pool, &req.key).await? {
        KeyValidation::Valid { .. } => Ok(HttpResponse::Ok().json(ValidateResponse {
            valid: true,
            config: Some(VpnConnectionInfo::from_config(&config)),
            error: None,
        })),
        KeyValidation::Invalid { reason } => {
            Ok(HttpResponse::Unauthorized().json(ValidateResponse {
                valid: false,
                config: None,
                error: Some(reason.as_str().to_string()),
            }))
        }
    }
}

/// Registers the desktop client's WireGuard public key: validates the
/// activation key, then binds the peer and syncs the gateway. Returns the
/// allocated tunnel address.
#[post("/register")]
pub async fn post_register(
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    wg: web::Data<gateway::WgCli>,
    req: web::Json<RegisterRequest>,
) -> Res<HttpResponse> {
    let user_id = match provisioning::services::provision::validate_key(&pool, &req.key).await? {
        KeyValidation::Valid { user_id } => user_id,
        KeyValidation::Invalid { reason } => {
            return Ok(HttpResponse::Unauthorized().json(RegisterResponse {
                success: false,
                client_ip: None,
                error: Some(reason.as_str().to_string()),
            }));
        }
    };

    let registration = gateway::register_peer(
        &pool,
        &wg,
        config.vpn.subnet,
        user_id,
        &req.client_public_key,
    )
    .await;

    match registration {
        Ok(registration) => Ok(HttpResponse::Ok().json(RegisterResponse {
            success: true,
            client_ip: Some(registration.client_ip.to_string()),
            error: None,
        })),
        Err(AppError::BadRequest(message)) => {
            Ok(HttpResponse::BadRequest().json(RegisterResponse {
                success: false,
                client_ip: None,
                error: Some(message),
            }))
        }
        Err(other) => Err(other),
    }
}

/// Shared-token guard for the administrative scope. An unset token
/// disables these endpoints entirely rather than leaving them open.
fn require_admin(http_req: &HttpRequest, config: &Config) -> Res<()> {
    if config.admin_token.is_empty() {
        return Err(AppError::Unauthorized(
            "Administrative endpoints are disabled".to_string(),
        ));
    }

    let presented = http_req
        .headers()
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if presented != config.admin_token {
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(())
}

/// Administrative revocation by raw key text. Resolves to the same state
/// transition as the subscription-lifecycle revocation path.
#[post("/revoke")]
pub async fn post_revoke(
    http_req: HttpRequest,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    req: web::Json<RevokeRequest>,
) -> Res<impl actix_web::Responder> {
    require_admin(&http_req, &config)?;

    let revoked = provisioning::services::provision::revoke_key_by_text(&pool, &req.key).await?;
    Success::ok(serde_json::json!({ "revoked": revoked }))
}

/// Looks up a user's activation key record for support tooling and the
/// dashboard, which shows the key text to its owner. The key is stored in
/// plaintext precisely so this retrieval stays possible.
#[get("/key/{user_id}")]
pub async fn get_key(
    http_req: HttpRequest,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    path: web::Path<Uuid>,
) -> Res<impl actix_web::Responder> {
    require_admin(&http_req, &config)?;

    let user_id = path.into_inner();
    match db::activation_key::get_by_user_id(pool.get_ref().as_ref(), user_id).await? {
        Some(record) => Success::ok(record),
        None => Err(AppError::NotFound(
            "No activation key on record for this user".to_string(),
        )),
    }
}
