use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::constants::SIGNATURE_WINDOW_SECS;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Canonical string covered by the XP grant signature. Game servers must
/// build the exact same string on their side before signing.
pub fn canonical_action_payload(
    asset_id: &str,
    action_key: &str,
    quantity: i64,
    difficulty_multiplier: f64,
    timestamp: i64,
) -> String {
    format!("{asset_id}:{action_key}:{quantity}:{difficulty_multiplier}:{timestamp}")
}

pub fn sign_payload(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to initialize HMAC: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a time-windowed HMAC-SHA256 signature over `payload`.
///
/// The timestamp must fall within `SIGNATURE_WINDOW_SECS` of `now`, and the
/// signature comparison is constant-time (`Mac::verify_slice`).
pub fn verify_signed_payload(
    secret: &str,
    payload: &str,
    signature_hex: &str,
    timestamp: i64,
    now: i64,
) -> Result<()> {
    if signature_hex.is_empty() {
        return Err(AppError::AuthError("Missing XP signature".to_string()));
    }
    if (now - timestamp).abs() > SIGNATURE_WINDOW_SECS {
        return Err(AppError::AuthError(
            "XP signature timestamp outside the allowed window".to_string(),
        ));
    }

    let signature = hex::decode(signature_hex).map_err(|_| AppError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to initialize HMAC: {}", e)))?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn signed(payload: &str) -> String {
        sign_payload(SECRET, payload).unwrap()
    }

    #[test]
    fn valid_signature_inside_window_verifies() {
        let payload = canonical_action_payload("asset-1", "boss_kill", 2, 1.5, 1_700_000_000);
        let sig = signed(&payload);
        assert!(verify_signed_payload(SECRET, &payload, &sig, 1_700_000_000, 1_700_000_030).is_ok());
    }

    #[test]
    fn expired_timestamp_is_rejected() {
        let payload = canonical_action_payload("asset-1", "boss_kill", 1, 1.0, 1_700_000_000);
        let sig = signed(&payload);
        let result =
            verify_signed_payload(SECRET, &payload, &sig, 1_700_000_000, 1_700_000_000 + 61);
        match result {
            Err(AppError::AuthError(msg)) => assert!(msg.contains("window")),
            other => panic!("expected AuthError, got {other:?}"),
        }
    }

    #[test]
    fn future_timestamp_outside_window_is_rejected() {
        let payload = canonical_action_payload("asset-1", "enemy_kill", 1, 1.0, 1_700_000_100);
        let sig = signed(&payload);
        assert!(verify_signed_payload(SECRET, &payload, &sig, 1_700_000_100, 1_700_000_000).is_err());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let payload = canonical_action_payload("asset-1", "enemy_kill", 1, 1.0, 1_700_000_000);
        let sig = signed(&payload);
        let tampered = canonical_action_payload("asset-1", "boss_kill", 1, 1.0, 1_700_000_000);
        let result = verify_signed_payload(SECRET, &tampered, &sig, 1_700_000_000, 1_700_000_000);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let payload = canonical_action_payload("asset-1", "enemy_kill", 1, 1.0, 1_700_000_000);
        let sig = sign_payload("other-secret", &payload).unwrap();
        let result = verify_signed_payload(SECRET, &payload, &sig, 1_700_000_000, 1_700_000_000);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn non_hex_signature_fails_cleanly() {
        let payload = canonical_action_payload("asset-1", "enemy_kill", 1, 1.0, 1_700_000_000);
        let result =
            verify_signed_payload(SECRET, &payload, "not-hex!", 1_700_000_000, 1_700_000_000);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }
}
