//! Timestamp and identifier helpers.

use serde_json::Value as JsonValue;
use std::sync::{Mutex, OnceLock};
use ulid::{Generator, Ulid};

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

fn ulid_generator() -> &'static Mutex<Generator> {
    static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();
    GENERATOR.get_or_init(|| Mutex::new(Generator::new()))
}

/// Fresh document id. ULIDs from a process-wide monotonic generator, so primary
/// ids sort in creation order even within one millisecond; the NEW feed order
/// depends on this.
pub fn new_object_id() -> String {
    let mut generator = ulid_generator().lock().unwrap_or_else(|e| e.into_inner());
    generator
        .generate()
        .unwrap_or_else(|_| Ulid::new())
        .to_string()
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_object_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_epoch_z_format() {
        let result = now_epoch_z();
        assert!(result.ends_with('Z'));
        let numeric_part = result.trim_end_matches('Z');
        assert!(numeric_part.parse::<u64>().is_ok());
    }

    #[test]
    fn test_new_object_id_is_valid_ulid() {
        let id = new_object_id();
        assert!(ulid::Ulid::from_string(&id).is_ok());
    }

    #[test]
    fn test_new_object_ids_are_strictly_increasing() {
        let mut previous = new_object_id();
        for _ in 0..64 {
            let next = new_object_id();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_command_envelope_basic() {
        let envelope = command_envelope("test", "ok", serde_json::json!({}));
        assert_eq!(envelope["cmd"], "test");
        assert_eq!(envelope["status"], "ok");
        assert!(envelope["ts"].is_string());
        assert!(envelope["event_id"].is_string());
        assert_eq!(envelope["envelope_version"], "1.0.0");
    }
}
