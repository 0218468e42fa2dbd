use std::borrow::Cow;

use cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use crate::{codec::DEFAULT_MAX_TOKEN_BYTES, error::SessionError};

pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Cookie attributes and size limits used by [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone)]
pub struct CookieSessionConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) http_only: bool,
    pub(crate) same_site: SameSite,
    pub(crate) max_age: Option<Duration>,
    pub(crate) secure: bool,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) max_cookie_bytes: usize,
    pub(crate) clear_on_decode_error: bool,
}

impl Default for CookieSessionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            http_only: true,
            same_site: SameSite::Strict,
            max_age: None,
            secure: true,
            path: "/".into(),
            domain: None,
            max_cookie_bytes: DEFAULT_MAX_TOKEN_BYTES,
            clear_on_decode_error: false,
        }
    }
}

impl CookieSessionConfig {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Emit `Max-Age` and reject tokens issued longer than `max_age` ago.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Issue browser-session cookies whose tokens never expire by age.
    #[must_use]
    pub fn without_max_age(mut self) -> Self {
        self.max_age = None;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    /// Cap on the encoded cookie value. Saving a larger session fails.
    #[must_use]
    pub fn with_max_cookie_bytes(mut self, max_cookie_bytes: usize) -> Self {
        self.max_cookie_bytes = max_cookie_bytes;
        self
    }

    /// Offer a removal cookie when an inbound session cookie is rejected.
    ///
    /// Off by default: with it on, a client can tell a rejected cookie from a missing one.
    #[must_use]
    pub fn with_clear_on_decode_error(mut self, clear_on_decode_error: bool) -> Self {
        self.clear_on_decode_error = clear_on_decode_error;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    #[must_use]
    pub fn max_cookie_bytes(&self) -> usize {
        self.max_cookie_bytes
    }

    pub(crate) fn validate_name(&self) -> Result<(), SessionError> {
        if is_cookie_token(&self.name) {
            Ok(())
        } else {
            Err(SessionError::Config(format!(
                "invalid cookie name: {:?}",
                self.name
            )))
        }
    }

    pub(crate) fn validate_max_age(&self) -> Result<(), SessionError> {
        match self.max_age {
            Some(max_age) if max_age.is_negative() => Err(SessionError::Config(format!(
                "max_age must not be negative, got {max_age}"
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn build_cookie(
        &self,
        value: String,
        session_expiry: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), value))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone());

        let remaining = session_expiry.map(|expiry| std::cmp::max(expiry - now, Duration::ZERO));
        let max_age = match (self.max_age, remaining) {
            (Some(max_age), Some(remaining)) => Some(std::cmp::min(max_age, remaining)),
            (max_age, remaining) => max_age.or(remaining),
        };
        if let Some(max_age) = max_age {
            cookie_builder = cookie_builder.max_age(max_age);
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }

    pub(crate) fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), "");
        cookie.set_path(self.path.clone());
        if let Some(domain) = self.domain.clone() {
            cookie.set_domain(domain);
        }
        cookie.set_http_only(self.http_only);
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site);
        cookie.make_removal();
        cookie
    }
}

// RFC 6265 `cookie-name`: a non-empty RFC 2616 token.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}
