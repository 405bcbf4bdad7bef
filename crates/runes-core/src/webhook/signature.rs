use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature on signed deliveries.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Hex-encoded HMAC-SHA256 of `body` keyed by `secret`.
///
/// Receivers recompute this over the raw request body, so the signed bytes
/// must be exactly the bytes sent.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, CoreError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CoreError::Config(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_rfc4231_case_2() {
        let signature =
            sign("Jefe", b"what do ya want for nothing?").expect("any key length is valid");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn depends_on_secret_and_body() {
        let body = br#"{"eventType":"mint"}"#;
        let base = sign("s1", body).expect("must sign");
        assert_eq!(base.len(), 64);
        assert_ne!(base, sign("s2", body).expect("must sign"));
        assert_ne!(base, sign("s1", br#"{"eventType":"burn"}"#).expect("must sign"));
    }
}
