use cookie::Cookie;
use http::{HeaderMap, header};
use time::OffsetDateTime;

use crate::{
    codec::SessionCodec,
    config::CookieSessionConfig,
    directive::CookieDirective,
    error::{SessionError, SessionResult},
    secret::Secret,
    session::Session,
};

/// What happened to the inbound session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No session cookie was sent, or it was empty.
    Absent,
    /// The cookie authenticated and decoded.
    Loaded,
    /// The cookie was present but failed authentication or had expired.
    Rejected(SessionError),
}

/// The result of [`SessionStore::load`]: always a usable session, plus how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    session: Session,
    status: LoadStatus,
    cleanup: Option<CookieDirective>,
}

impl LoadedSession {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }

    #[must_use]
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self.status, LoadStatus::Rejected(_))
    }

    #[must_use]
    pub fn rejection(&self) -> Option<&SessionError> {
        match &self.status {
            LoadStatus::Rejected(err) => Some(err),
            LoadStatus::Absent | LoadStatus::Loaded => None,
        }
    }

    /// A removal cookie for the rejected inbound cookie, when
    /// [`CookieSessionConfig::with_clear_on_decode_error`] is enabled.
    #[must_use]
    pub fn cleanup(&self) -> Option<&CookieDirective> {
        self.cleanup.as_ref()
    }

    /// Surface a rejection as an error instead of an empty session.
    ///
    /// # Errors
    ///
    /// Returns the decode error if the inbound cookie was rejected.
    pub fn into_strict(self) -> SessionResult<Session> {
        match self.status {
            LoadStatus::Rejected(err) => Err(err),
            LoadStatus::Absent | LoadStatus::Loaded => Ok(self.session),
        }
    }
}

/// Loads sessions from request cookies and turns them back into `Set-Cookie` directives.
///
/// Construct one at startup and share it with handlers; it holds no per-request state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    codec: SessionCodec,
    config: CookieSessionConfig,
}

impl SessionStore {
    /// A store whose cookies are signed but readable by the client.
    #[must_use]
    pub fn signed(secret: Secret) -> Self {
        Self::from_codec(SessionCodec::new(secret), CookieSessionConfig::default())
    }

    /// A store whose cookies are encrypted, then signed.
    #[cfg(feature = "private")]
    #[must_use]
    pub fn private(secret: Secret) -> Self {
        Self::from_codec(
            SessionCodec::new(secret).with_protection(crate::Protection::Private),
            CookieSessionConfig::default(),
        )
    }

    fn from_codec(codec: SessionCodec, config: CookieSessionConfig) -> Self {
        let codec = codec
            .with_max_age(config.max_age)
            .with_max_token_bytes(config.max_cookie_bytes);
        Self { codec, config }
    }

    #[must_use]
    pub fn with_config(self, config: CookieSessionConfig) -> Self {
        Self::from_codec(self.codec, config)
    }

    /// Keep accepting cookies issued under older secrets while new ones are issued under the
    /// primary secret.
    #[must_use]
    pub fn with_fallback_secrets<I>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = Secret>,
    {
        self.codec = self.codec.with_fallback_secrets(fallbacks);
        self
    }

    #[must_use]
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub fn config(&self) -> &CookieSessionConfig {
        &self.config
    }

    /// Load the session named by the configured cookie from a `Cookie` header value.
    ///
    /// Never fails: a missing cookie yields an empty session with [`LoadStatus::Absent`], and
    /// an invalid one yields an empty session with [`LoadStatus::Rejected`].
    #[must_use]
    pub fn load(&self, cookie_header: Option<&str>) -> LoadedSession {
        self.load_at(cookie_header, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn load_at(&self, cookie_header: Option<&str>, now: OffsetDateTime) -> LoadedSession {
        let Some(token) = cookie_header.and_then(|header| self.find_token(header)) else {
            return LoadedSession {
                session: Session::new(),
                status: LoadStatus::Absent,
                cleanup: None,
            };
        };

        match self.codec.decode_at(&token, now) {
            Ok(session) => {
                tracing::trace!(cookie = %self.config.name, "session cookie loaded");
                LoadedSession {
                    session,
                    status: LoadStatus::Loaded,
                    cleanup: None,
                }
            }
            Err(err) => {
                tracing::debug!(err = %err, cookie = %self.config.name, "session cookie rejected");
                let cleanup = self.config.clear_on_decode_error.then(|| self.remove());
                LoadedSession {
                    session: Session::new(),
                    status: LoadStatus::Rejected(err),
                    cleanup,
                }
            }
        }
    }

    /// Like [`SessionStore::load`], but a rejected cookie is an error. A missing cookie is
    /// still an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Authentication`] or [`SessionError::Expired`].
    pub fn load_strict(&self, cookie_header: Option<&str>) -> SessionResult<Session> {
        self.load(cookie_header).into_strict()
    }

    /// Load from every `Cookie` header in `headers`.
    ///
    /// Headers carrying non-ASCII bytes from other cookies are still searched; only the session
    /// token itself has to be ASCII.
    #[must_use]
    pub fn load_from_headers(&self, headers: &HeaderMap) -> LoadedSession {
        let joined = headers
            .get_all(header::COOKIE)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
            .collect::<Vec<_>>()
            .join("; ");
        self.load((!joined.is_empty()).then_some(joined.as_str()))
    }

    /// Encode `session` into a `Set-Cookie` directive.
    ///
    /// The directive must be applied to the response headers before any of the response body
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if the session is too large for a cookie, and
    /// [`SessionError::Config`] if the configured cookie name or max age is invalid.
    pub fn save(&self, session: &Session) -> SessionResult<CookieDirective> {
        self.save_at(session, OffsetDateTime::now_utc())
    }

    pub fn save_at(
        &self,
        session: &Session,
        now: OffsetDateTime,
    ) -> SessionResult<CookieDirective> {
        self.config.validate_name()?;
        self.config.validate_max_age()?;
        let token = self.codec.encode_at(session, now)?;
        let cookie = self
            .config
            .build_cookie(token.into_string(), session.expiry(), now);
        Ok(CookieDirective::new(cookie))
    }

    /// A directive that deletes the session cookie.
    #[must_use]
    pub fn remove(&self) -> CookieDirective {
        CookieDirective::new(self.config.removal_cookie())
    }

    fn find_token(&self, header: &str) -> Option<String> {
        Cookie::split_parse(header)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.config.name)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty())
    }
}
