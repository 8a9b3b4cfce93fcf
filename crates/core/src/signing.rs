use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("signed link expired")]
    Expired,
    #[error("signature does not match")]
    InvalidSignature,
}

/// Issues and verifies expiring HMAC-SHA256 signatures for stored quote
/// files, so PDF links can be shared without exposing the quotes directory.
#[derive(Clone)]
pub struct FileLinkSigner {
    secret: SecretString,
}

impl FileLinkSigner {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Signature over `"<file>:<expiry millis>"`, URL-safe unpadded base64.
    pub fn sign(&self, file_name: &str, expires_at_ms: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(format!("{file_name}:{expires_at_ms}").as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    pub fn verify(
        &self,
        file_name: &str,
        expires_at_ms: i64,
        signature: &str,
        now_ms: i64,
    ) -> Result<(), LinkError> {
        if now_ms > expires_at_ms {
            return Err(LinkError::Expired);
        }
        let expected = self.sign(file_name, expires_at_ms);
        // fixed-length digests; compare without short-circuiting
        let matches = expected.len() == signature.len()
            && expected
                .bytes()
                .zip(signature.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0;
        if matches {
            Ok(())
        } else {
            Err(LinkError::InvalidSignature)
        }
    }
}

/// Only plain file names may be served; anything that could traverse paths
/// is rejected up front.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
}
