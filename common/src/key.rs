use crate::error::{AppError, Res};

/// Fixed tag every activation key starts with.
pub const KEY_PREFIX: &str = "CLOAK";
pub const SEGMENT_COUNT: usize = 4;
pub const SEGMENT_LEN: usize = 4;

/// Uppercase letters and digits with the visually ambiguous 0/O, 1/I/L removed.
const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generates a fresh activation key in the form `CLOAK-XXXX-XXXX-XXXX-XXXX`.
///
/// Symbols are drawn from the OS CSPRNG. Predictability here would be a full
/// authentication bypass, so a weaker source is never acceptable.
pub fn generate() -> Res<String> {
    let mut symbols = [0u8; SEGMENT_COUNT * SEGMENT_LEN];
    let mut filled = 0;

    while filled < symbols.len() {
        let mut buf = [0u8; 64];
        getrandom::getrandom(&mut buf)
            .map_err(|e| AppError::Internal(format!("System RNG failure: {}", e)))?;

        for byte in buf {
            // Rejection sampling keeps the draw uniform over the alphabet.
            let idx = (byte & 0x1f) as usize;
            if idx < ALPHABET.len() {
                symbols[filled] = ALPHABET[idx];
                filled += 1;
                if filled == symbols.len() {
                    break;
                }
            }
        }
    }

    let mut key = String::with_capacity(KEY_PREFIX.len() + SEGMENT_COUNT * (SEGMENT_LEN + 1));
    key.push_str(KEY_PREFIX);
    for segment in symbols.chunks(SEGMENT_LEN) {
        key.push('-');
        for &symbol in segment {
            key.push(symbol as char);
        }
    }

    Ok(key)
}

/// Keys are case-insensitive to the user; storage and lookup use this form.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Checks prefix, grouping and alphabet of an already-normalized key, so that
/// malformed input is rejected before any storage round trip.
pub fn is_well_formed(key: &str) -> bool {
    let mut parts = key.split('-');
    if parts.next() != Some(KEY_PREFIX) {
        return false;
    }

    let mut segments = 0;
    for part in parts {
        if part.len() != SEGMENT_LEN || !part.bytes().all(|b| ALPHABET.contains(&b)) {
            return false;
        }
        segments += 1;
    }
    segments == SEGMENT_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_matches_format() {
        let key = generate().unwrap();
        assert!(key.starts_with("CLOAK-"));
        assert_eq!(key.len(), 25);
        assert!(is_well_formed(&key));
    }

    #[test]
    fn generated_key_avoids_ambiguous_symbols() {
        for _ in 0..50 {
            let key = generate().unwrap();
            for banned in ['0', 'O', '1', 'I', 'L'] {
                assert!(
                    !key[KEY_PREFIX.len()..].contains(banned),
                    "key {} contains ambiguous symbol {}",
                    key,
                    banned
                );
            }
        }
    }

    #[test]
    fn consecutive_keys_differ() {
        let first = generate().unwrap();
        let second = generate().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize("  cloak-abcd-efgh-jkmn-pqrs "), "CLOAK-ABCD-EFGH-JKMN-PQRS");
    }

    #[test]
    fn well_formed_rejects_bad_shapes() {
        assert!(is_well_formed("CLOAK-ABCD-EFGH-JKMN-PQRS"));
        assert!(!is_well_formed("CLOAK-ABCD-EFGH-JKMN"));
        assert!(!is_well_formed("VAULT-ABCD-EFGH-JKMN-PQRS"));
        assert!(!is_well_formed("CLOAK-AB0D-EFGH-JKMN-PQRS"));
        assert!(!is_well_formed("CLOAK-ABCD-EFGH-JKMN-PQRS-WXYZ"));
        assert!(!is_well_formed(""));
    }
}
