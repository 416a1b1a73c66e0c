use std::net::Ipv4Addr;

use base64::{Engine, engine::general_purpose::STANDARD};
use common::{
    error::{AppError, Res},
    ipalloc,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::wg::WgCli;

/// A WireGuard public key is 32 raw bytes base64-encoded: 44 characters in
/// the strict base64 alphabet with a single trailing `=` pad. Anything else
/// is rejected before storage or the gateway is touched.
pub fn is_wireguard_public_key(key: &str) -> bool {
    if key.len() != 44 || !key.ends_with('=') {
        return false;
    }
    if !key[..43]
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
    {
        return false;
    }
    matches!(STANDARD.decode(key), Ok(raw) if raw.len() == 32)
}

pub struct PeerRegistration {
    pub client_ip: Ipv4Addr,
}

/// Binds a validated user's WireGuard public key to their stable tunnel
/// address and mirrors the binding onto the gateway peer table.
///
/// The database write comes first and must succeed; it is the source of
/// truth. Gateway synchronization is best effort: an unreachable gateway is
/// logged for reconciliation but never fails the call, so losing the
/// gateway cannot block a paying user from completing registration.
pub async fn register_peer(
    pool: &PgPool,
    wg: &WgCli,
    subnet: Ipv4Addr,
    user_id: Uuid,
    client_public_key: &str,
) -> Res<PeerRegistration> {
    let public_key = client_public_key.trim();
    if !is_wireguard_public_key(public_key) {
        return Err(AppError::BadRequest(
            "Invalid WireGuard public key".to_string(),
        ));
    }

    let client_ip = ipalloc::allocate(subnet, &user_id)?;
    if !ipalloc::in_subnet(subnet, client_ip) {
        return Err(AppError::Internal(format!(
            "Allocated address {} escapes the tunnel subnet",
            client_ip
        )));
    }

    let previous =
        db::activation_key::bind_peer(pool, user_id, public_key, &client_ip.to_string()).await?;

    // Replacing a key (app reinstall) must supersede the old gateway entry
    // for the same address rather than accumulate stale peers.
    if let Some(previous) = previous.filter(|prev| prev != public_key) {
        if let Err(e) = wg.remove_peer(&previous).await {
            log::warn!(
                "Could not remove superseded peer for user {} (old key {}): {}",
                user_id,
                previous,
                e
            );
        }
    }

    if let Err(e) = wg.remove_peer(public_key).await {
        log::warn!(
            "Could not clear existing gateway entry for user {}: {}",
            user_id,
            e
        );
    }

    match wg.add_peer(public_key, client_ip).await {
        Ok(()) => {
            log::info!("Gateway peer registered for user {} at {}", user_id, client_ip);
        }
        Err(e) => {
            // Binding is durably recorded; a retry or manual sync can
            // replay it onto the gateway from this log line.
            log::error!(
                "Gateway sync failed for user {} (key {}, ip {}): {}",
                user_id,
                public_key,
                client_ip,
                e
            );
        }
    }

    Ok(PeerRegistration { client_ip })
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64 of 32 zero bytes
    const VALID_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    #[test]
    fn accepts_canonical_public_key() {
        assert_eq!(VALID_KEY.len(), 44);
        assert!(is_wireguard_public_key(VALID_KEY));
        assert!(is_wireguard_public_key("hBCiJTpVCYNIbBAPCbKmJQ7XG+zkQUDpKAkyOAyR8Dc="));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(!is_wireguard_public_key(&VALID_KEY[..43]));
        assert!(!is_wireguard_public_key(&format!("{}A", VALID_KEY)));
        assert!(!is_wireguard_public_key(""));
    }

    #[test]
    fn rejects_bad_alphabet_and_padding() {
        assert!(!is_wireguard_public_key(
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
        ));
        assert!(!is_wireguard_public_key(
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=="
        ));
        assert!(!is_wireguard_public_key(
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA!AAA="
        ));
        assert!(!is_wireguard_public_key(
            " AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
        ));
    }
}
