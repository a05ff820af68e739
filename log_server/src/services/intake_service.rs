//! Intake payload validation.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::event::RawEvent;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_SCHEME: &str = "sha256=";

/// Check `signature` (`sha256=<hex>` over the raw body) against `secret`.
///
/// An empty secret turns validation off. The scheme prefix is mandatory.
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Intake secret not configured, accepting unsigned batch");
        return true;
    }

    let Some(digest) = signature
        .trim()
        .strip_prefix(SIGNATURE_SCHEME)
        .and_then(|encoded| hex::decode(encoded).ok())
    else {
        return false;
    };

    batch_mac(secret, payload).is_some_and(|mac| mac.verify_slice(&digest).is_ok())
}

/// Header value a producer sends for `payload`.
pub fn sign(secret: &str, payload: &[u8]) -> Option<String> {
    let digest = batch_mac(secret, payload)?.finalize().into_bytes();
    Some(format!("{SIGNATURE_SCHEME}{}", hex::encode(digest)))
}

fn batch_mac(secret: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(mac)
}

/// Reject batches that cannot form a single run.
pub fn check_batch(events: &[RawEvent]) -> Result<(), &'static str> {
    let Some(first) = events.first() else {
        return Err("batch contains no events");
    };
    if first.transaction_id.trim().is_empty() {
        return Err("transactionId is required");
    }
    if events
        .iter()
        .any(|e| e.transaction_id != first.transaction_id)
    {
        tracing::warn!(
            transaction_id = %first.transaction_id,
            "Batch mixes transaction ids; run fields come from the first event"
        );
    }
    Ok(())
}
