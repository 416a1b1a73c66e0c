use std::net::Ipv4Addr;

use uuid::Uuid;

use crate::error::{AppError, Res};

/// Last octet reserved for the gateway itself inside the tunnel subnet.
pub const GATEWAY_OCTET: u8 = 1;

/// Usable host slots in a /24 once .0, .1 and .255 are excluded.
const HOST_SLOTS: u32 = 253;

/// Maps a user to a stable tunnel address inside the configured /24 block.
///
/// A rolling 31-multiplier hash over the canonical user-id string, truncated
/// to 32 bits, picks a last octet in [2, 254]. The same user always lands on
/// the same address, so no allocation table or sequence counter is needed;
/// the small collision probability across users is accepted in exchange for
/// statelessness. This is the only implementation of the mapping — every
/// caller must go through it rather than re-derive the hash.
pub fn allocate(subnet: Ipv4Addr, user_id: &Uuid) -> Res<Ipv4Addr> {
    let canonical = user_id.to_string();

    let mut hash: i32 = 0;
    for c in canonical.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }

    let last_octet = hash.unsigned_abs() % HOST_SLOTS + 2;
    // Unreachable given the modulo arithmetic; guards against arithmetic edits.
    if !(2..=254).contains(&last_octet) {
        return Err(AppError::Internal(format!(
            "Allocated host octet {} outside the usable range",
            last_octet
        )));
    }

    let [a, b, c, _] = subnet.octets();
    Ok(Ipv4Addr::new(a, b, c, last_octet as u8))
}

/// True when `ip` is a valid client address inside the /24 given by `subnet`.
pub fn in_subnet(subnet: Ipv4Addr, ip: Ipv4Addr) -> bool {
    let base = subnet.octets();
    let addr = ip.octets();
    base[0] == addr[0]
        && base[1] == addr[1]
        && base[2] == addr[2]
        && (2..=254).contains(&addr[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBNET: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);

    #[test]
    fn allocation_is_deterministic() {
        let user = Uuid::new_v4();
        let first = allocate(SUBNET, &user).unwrap();
        let second = allocate(SUBNET, &user).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn allocation_stays_inside_usable_range() {
        for _ in 0..500 {
            let ip = allocate(SUBNET, &Uuid::new_v4()).unwrap();
            let octets = ip.octets();
            assert_eq!(&octets[..3], &[10, 0, 0]);
            assert!((2..=254).contains(&octets[3]), "got {}", ip);
            assert!(in_subnet(SUBNET, ip));
        }
    }

    #[test]
    fn allocation_follows_configured_block() {
        let user = Uuid::new_v4();
        let ip = allocate(Ipv4Addr::new(10, 8, 11, 0), &user).unwrap();
        assert_eq!(&ip.octets()[..3], &[10, 8, 11]);
    }

    #[test]
    fn subnet_check_rejects_reserved_and_foreign_addresses() {
        assert!(!in_subnet(SUBNET, Ipv4Addr::new(10, 0, 0, 1)));
        assert!(!in_subnet(SUBNET, Ipv4Addr::new(10, 0, 0, 255)));
        assert!(!in_subnet(SUBNET, Ipv4Addr::new(10, 0, 1, 7)));
        assert!(in_subnet(SUBNET, Ipv4Addr::new(10, 0, 0, 254)));
    }
}
