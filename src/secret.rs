use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::{SessionError, SessionResult};

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of the authentication tag appended to every token.
pub(crate) const TAG_LEN: usize = 32;

/// Keying material for signing (and, in private mode, encrypting) session tokens.
///
/// Cloning is cheap; all clones share the same bytes. The `Debug` output never contains the
/// key.
#[derive(Clone)]
pub struct Secret {
    bytes: Arc<[u8]>,
    #[cfg(feature = "private")]
    cipher: cookie::Key,
}

impl Secret {
    /// Minimum accepted secret length in bytes.
    pub const MIN_LEN: usize = 32;

    /// Length of secrets produced by [`Secret::generate`].
    pub const GENERATED_LEN: usize = 64;

    /// Use `bytes` as the secret.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSecret`] if `bytes` is shorter than [`Secret::MIN_LEN`].
    pub fn new(bytes: impl AsRef<[u8]>) -> SessionResult<Self> {
        let bytes = bytes.as_ref();
        if bytes.len() < Self::MIN_LEN {
            return Err(SessionError::InvalidSecret(format!(
                "secret must be at least {} bytes, got {}",
                Self::MIN_LEN,
                bytes.len()
            )));
        }
        Ok(Self::from_checked(bytes))
    }

    /// Decode a standard (padded) base64 secret, as typically stored in an environment
    /// variable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSecret`] if the input is not base64 or decodes to fewer
    /// than [`Secret::MIN_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> SessionResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| SessionError::InvalidSecret(err.to_string()))?;
        Self::new(bytes)
    }

    /// Generate a random secret from the thread-local CSPRNG.
    ///
    /// Sessions signed with a generated secret do not survive a process restart.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::GENERATED_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_checked(&bytes)
    }

    fn from_checked(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
            #[cfg(feature = "private")]
            cipher: derive_cipher_key(bytes),
        }
    }

    pub(crate) fn sign(&self, payload: &[u8], issued_at: &[u8]) -> SessionResult<[u8; TAG_LEN]> {
        let mut mac = self.mac()?;
        mac.update(payload);
        mac.update(issued_at);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }

    /// Constant-time comparison of `tag` against the MAC of `payload || issued_at`.
    pub(crate) fn verify(&self, payload: &[u8], issued_at: &[u8], tag: &[u8]) -> bool {
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(payload);
        mac.update(issued_at);
        mac.verify_slice(tag).is_ok()
    }

    #[cfg(feature = "private")]
    pub(crate) fn cipher(&self) -> &cookie::Key {
        &self.cipher
    }

    fn mac(&self) -> SessionResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.bytes)
            .map_err(|err| SessionError::InvalidSecret(err.to_string()))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// Separate key for encryption so the MAC key is never fed to the cipher.
#[cfg(feature = "private")]
fn derive_cipher_key(secret: &[u8]) -> cookie::Key {
    use sha2::{Digest as _, Sha512};

    let digest = Sha512::new()
        .chain_update(b"cookie-session-store/encryption")
        .chain_update(secret)
        .finalize();
    cookie::Key::from(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_secret() {
        let err = Secret::new([0u8; 31]).expect_err("31 bytes is too short");
        assert!(matches!(err, SessionError::InvalidSecret(_)));
        assert!(Secret::new([0u8; 32]).is_ok());
    }

    #[test]
    fn debug_is_redacted() {
        let secret =
            Secret::new(b"a-very-long-secret-that-should-not-leak!").expect("valid secret");
        let printed = format!("{secret:?}");
        assert_eq!(printed, "Secret(<redacted>)");
        assert!(!printed.contains("leak"));
    }

    #[test]
    fn from_base64_roundtrips_bytes() {
        let raw = [9u8; 48];
        let encoded = STANDARD.encode(raw);
        let secret = Secret::from_base64(&format!("  {encoded}\n")).expect("valid base64 secret");
        let tag = secret.sign(b"payload", b"ts").expect("sign succeeds");
        let direct = Secret::new(raw).expect("valid secret");
        assert!(direct.verify(b"payload", b"ts", &tag));
    }

    #[test]
    fn from_base64_rejects_garbage() {
        assert!(matches!(
            Secret::from_base64("not base64 at all!"),
            Err(SessionError::InvalidSecret(_))
        ));
    }

    #[test]
    fn verify_detects_any_change() {
        let secret = Secret::generate();
        let tag = secret.sign(b"payload", b"12345678").expect("sign succeeds");

        assert!(secret.verify(b"payload", b"12345678", &tag));
        assert!(!secret.verify(b"paylaod", b"12345678", &tag));
        assert!(!secret.verify(b"payload", b"12345679", &tag));
        assert!(!secret.verify(b"payload", b"12345678", &tag[..TAG_LEN - 1]));
        assert!(!Secret::generate().verify(b"payload", b"12345678", &tag));
    }
}
