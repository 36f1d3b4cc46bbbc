//! Webhook signature verification.
//!
//! The provider signs the raw request body with HMAC keyed by the shared
//! webhook secret and sends the hex digest as `<algo>=<hex>`. Both the legacy
//! SHA-1 scheme (`X-Hub-Signature`) and the SHA-256 scheme
//! (`X-Hub-Signature-256`) are accepted.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

pub const SHA1_SIGNATURE_HEADER: &str = "X-Hub-Signature";
pub const SHA256_SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    pub fn prefix(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => "sha1=",
            SignatureAlgorithm::Sha256 => "sha256=",
        }
    }

    pub fn header_name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => SHA1_SIGNATURE_HEADER,
            SignatureAlgorithm::Sha256 => SHA256_SIGNATURE_HEADER,
        }
    }
}

/// Splits `sha256=abcd...` into its algorithm and hex digest.
fn parse_signature(presented: &str) -> Option<(SignatureAlgorithm, &str)> {
    [SignatureAlgorithm::Sha256, SignatureAlgorithm::Sha1]
        .into_iter()
        .find_map(|algorithm| {
            presented
                .strip_prefix(algorithm.prefix())
                .map(|digest| (algorithm, digest))
        })
}

/// Verifies `presented` against the HMAC of `payload` keyed with `secret`.
///
/// Returns false for an empty, malformed or unknown-algorithm signature as
/// well as on mismatch. The digest comparison is constant-time.
pub fn verify(secret: &str, payload: &[u8], presented: &str) -> bool {
    let Some((algorithm, hex_digest)) = parse_signature(presented) else {
        return false;
    };

    let Ok(digest) = hex::decode(hex_digest) else {
        return false;
    };

    let verified = match algorithm {
        SignatureAlgorithm::Sha1 => HmacSha1::new_from_slice(secret.as_bytes()).map(|mut mac| {
            mac.update(payload);
            mac.verify_slice(&digest).is_ok()
        }),
        SignatureAlgorithm::Sha256 => {
            HmacSha256::new_from_slice(secret.as_bytes()).map(|mut mac| {
                mac.update(payload);
                mac.verify_slice(&digest).is_ok()
            })
        }
    };

    verified.unwrap_or(false)
}

/// Produces the header value the provider would send for `payload`.
pub fn sign(secret: &str, payload: &[u8], algorithm: SignatureAlgorithm) -> String {
    let digest = match algorithm {
        SignatureAlgorithm::Sha1 => HmacSha1::new_from_slice(secret.as_bytes()).map(|mut mac| {
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }),
        SignatureAlgorithm::Sha256 => {
            HmacSha256::new_from_slice(secret.as_bytes()).map(|mut mac| {
                mac.update(payload);
                mac.finalize().into_bytes().to_vec()
            })
        }
    }
    // HMAC accepts keys of any length
    .unwrap_or_default();

    format!("{}{}", algorithm.prefix(), hex::encode(digest))
}
