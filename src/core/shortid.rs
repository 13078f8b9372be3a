//! Short-id generation: the compact public-facing alias of a content item.
//!
//! Pure random base58 strings; uniqueness is enforced by the store's UNIQUE
//! constraint, and the caller retries on collision. Entropy makes collisions
//! rare at scale, never impossible.

use rand::Rng;

/// Base58: no `0`, `O`, `I`, `l`.
pub const SHORT_ID_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Retry budget for the generate-insert loop before giving up.
pub const MAX_GENERATE_ATTEMPTS: u32 = 16;

pub fn random_short_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())] as char)
        .collect()
}

/// True when the error is the `agoragrams.short_id` UNIQUE violation the
/// generator loop must retry on. Any other constraint failure propagates.
pub fn is_short_id_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, Some(msg)) => {
            code.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("agoragrams.short_id")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_length() {
        assert_eq!(random_short_id(7).chars().count(), 7);
        assert_eq!(random_short_id(12).chars().count(), 12);
        assert!(random_short_id(0).is_empty());
    }

    #[test]
    fn test_short_id_uses_alphabet_only() {
        let id = random_short_id(256);
        for ch in id.bytes() {
            assert!(SHORT_ID_ALPHABET.contains(&ch), "unexpected char {}", ch as char);
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_chars() {
        for banned in [b'0', b'O', b'I', b'l'] {
            assert!(!SHORT_ID_ALPHABET.contains(&banned));
        }
    }
}
