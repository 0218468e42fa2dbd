//! The session token format.
//!
//! A token is `base64url_nopad(payload || issued_at || tag)` where `issued_at` is the issue time
//! as 8 big-endian bytes of unix seconds and `tag` is HMAC-SHA256 over `payload || issued_at`.
//! In signed mode `payload` is the JSON envelope; in private mode it is the raw nonce and
//! ciphertext of the envelope encrypted with AES-256-GCM.
//!
//! Nothing in the payload is looked at before the tag verifies.

use std::{collections::BTreeMap, fmt, sync::Arc};

#[cfg(feature = "private")]
use base64::engine::general_purpose::STANDARD;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::{
    error::{SessionError, SessionResult},
    secret::{Secret, TAG_LEN},
    session::Session,
};

const VERSION: u8 = 1;
const TIMESTAMP_LEN: usize = 8;
const TRAILER_LEN: usize = TIMESTAMP_LEN + TAG_LEN;

/// Default cap on the encoded token, leaving room for the cookie name and attributes inside
/// the ~4096 byte budget browsers allow per cookie.
pub const DEFAULT_MAX_TOKEN_BYTES: usize = 4000;

#[cfg(feature = "private")]
const CIPHER_LABEL: &str = "cookie-session-store";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    #[serde(default)]
    data: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// How the payload is protected inside the token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protection {
    /// Readable by the client, tamper-evident.
    #[default]
    Signed,
    /// Encrypted, then signed. Values are not readable by the client.
    #[cfg(feature = "private")]
    Private,
}

/// An encoded session, ready to be used as a cookie value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Encodes sessions into authenticated tokens and back.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    secret: Secret,
    fallbacks: Arc<[Secret]>,
    protection: Protection,
    max_age: Option<Duration>,
    max_token_bytes: usize,
}

impl SessionCodec {
    /// A signed codec with no expiry and the default size cap.
    #[must_use]
    pub fn new(secret: Secret) -> Self {
        Self {
            secret,
            fallbacks: Arc::from(Vec::new()),
            protection: Protection::default(),
            max_age: None,
            max_token_bytes: DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    #[must_use]
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    /// Reject tokens issued more than `max_age` ago. `None` disables the check.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_max_token_bytes(mut self, max_token_bytes: usize) -> Self {
        self.max_token_bytes = max_token_bytes;
        self
    }

    /// Additional secrets accepted when decoding, tried in order after the primary one.
    /// Tokens are always issued under the primary secret.
    #[must_use]
    pub fn with_fallback_secrets<I>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = Secret>,
    {
        self.fallbacks = fallbacks.into_iter().collect();
        self
    }

    #[must_use]
    pub fn protection(&self) -> Protection {
        self.protection
    }

    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    #[must_use]
    pub fn max_token_bytes(&self) -> usize {
        self.max_token_bytes
    }

    /// Encode `session`, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if the token would exceed the size cap.
    pub fn encode(&self, session: &Session) -> SessionResult<Token> {
        self.encode_at(session, OffsetDateTime::now_utc())
    }

    /// Encode `session` as if issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if the token would exceed the size cap.
    pub fn encode_at(&self, session: &Session, now: OffsetDateTime) -> SessionResult<Token> {
        let envelope = Envelope {
            v: VERSION,
            data: session.data().clone(),
            exp: session.expiry().map(OffsetDateTime::unix_timestamp),
        };
        let json = serde_json::to_string(&envelope)
            .map_err(|err| SessionError::Encoding(err.to_string()))?;
        let payload = self.seal(json)?;

        let encoded_len = base64::encoded_len(payload.len() + TRAILER_LEN, false)
            .ok_or_else(|| SessionError::Encoding("session payload is too large".into()))?;
        if encoded_len > self.max_token_bytes {
            return Err(SessionError::Encoding(format!(
                "session token exceeds max_token_bytes ({} > {})",
                encoded_len, self.max_token_bytes
            )));
        }

        let issued_at = now.unix_timestamp().to_be_bytes();
        let tag = self.secret.sign(&payload, &issued_at)?;

        let mut bytes = payload;
        bytes.reserve(TRAILER_LEN);
        bytes.extend_from_slice(&issued_at);
        bytes.extend_from_slice(&tag);

        Ok(Token(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Authenticate and decode `token` against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Authentication`] for anything that is not an untampered token
    /// issued under one of the configured secrets, and [`SessionError::Expired`] for a
    /// genuine token past its validity window.
    pub fn decode(&self, token: &str) -> SessionResult<Session> {
        self.decode_at(token, OffsetDateTime::now_utc())
    }

    /// Authenticate and decode `token` as if the current time were `now`.
    ///
    /// A token issued at `t0` under `max_age = w` is accepted up to and including `t0 + w`.
    ///
    /// # Errors
    ///
    /// See [`SessionCodec::decode`].
    pub fn decode_at(&self, token: &str, now: OffsetDateTime) -> SessionResult<Session> {
        if token.len() > self.max_token_bytes {
            return Err(SessionError::Authentication);
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| SessionError::Authentication)?;
        if bytes.len() <= TRAILER_LEN {
            return Err(SessionError::Authentication);
        }

        let (payload, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
        let (issued_at, tag) = trailer.split_at(TIMESTAMP_LEN);

        let secret = std::iter::once(&self.secret)
            .chain(self.fallbacks.iter())
            .find(|secret| secret.verify(payload, issued_at, tag))
            .ok_or(SessionError::Authentication)?;

        let mut timestamp = [0u8; TIMESTAMP_LEN];
        timestamp.copy_from_slice(issued_at);
        let issued_at = OffsetDateTime::from_unix_timestamp(i64::from_be_bytes(timestamp))
            .map_err(|_| SessionError::Authentication)?;

        if let Some(max_age) = self.max_age
            && now - issued_at > max_age
        {
            return Err(SessionError::Expired);
        }

        let json = self.open(secret, payload)?;
        let envelope: Envelope =
            serde_json::from_str(&json).map_err(|_| SessionError::Authentication)?;
        if envelope.v != VERSION {
            return Err(SessionError::Authentication);
        }

        let expiry = envelope
            .exp
            .map(OffsetDateTime::from_unix_timestamp)
            .transpose()
            .map_err(|_| SessionError::Authentication)?;
        if let Some(expiry) = expiry
            && now > expiry
        {
            return Err(SessionError::Expired);
        }

        Ok(Session::from_parts(envelope.data, issued_at, expiry))
    }

    fn seal(&self, json: String) -> SessionResult<Vec<u8>> {
        match self.protection {
            Protection::Signed => Ok(json.into_bytes()),
            #[cfg(feature = "private")]
            Protection::Private => {
                let mut jar = cookie::CookieJar::new();
                jar.private_mut(self.secret.cipher())
                    .add(cookie::Cookie::new(CIPHER_LABEL, json));
                let sealed = jar
                    .get(CIPHER_LABEL)
                    .ok_or_else(|| SessionError::Encoding("session encryption failed".into()))?;
                // The jar hands back base64; store the raw sealed bytes so the token is only
                // encoded once.
                STANDARD
                    .decode(sealed.value())
                    .map_err(|err| SessionError::Encoding(err.to_string()))
            }
        }
    }

    #[cfg_attr(not(feature = "private"), allow(unused_variables))]
    fn open(&self, secret: &Secret, payload: &[u8]) -> SessionResult<String> {
        match self.protection {
            Protection::Signed => std::str::from_utf8(payload)
                .map(str::to_owned)
                .map_err(|_| SessionError::Authentication),
            #[cfg(feature = "private")]
            Protection::Private => {
                let mut jar = cookie::CookieJar::new();
                jar.add_original(cookie::Cookie::new(CIPHER_LABEL, STANDARD.encode(payload)));
                jar.private(secret.cipher())
                    .get(CIPHER_LABEL)
                    .map(|cookie| cookie.value().to_owned())
                    .ok_or(SessionError::Authentication)
            }
        }
    }
}
