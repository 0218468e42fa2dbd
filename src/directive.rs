use std::fmt;

use cookie::Cookie;
use http::{HeaderMap, HeaderValue, header};

use crate::error::{SessionError, SessionResult};

/// A `Set-Cookie` the caller must attach to the outbound response.
///
/// Headers can no longer change once the response body starts streaming, so the directive has
/// to be applied before any body bytes are written.
#[derive(Debug, Clone)]
pub struct CookieDirective {
    cookie: Cookie<'static>,
}

impl CookieDirective {
    pub(crate) fn new(cookie: Cookie<'static>) -> Self {
        Self { cookie }
    }

    #[must_use]
    pub fn cookie(&self) -> &Cookie<'static> {
        &self.cookie
    }

    #[must_use]
    pub fn into_cookie(self) -> Cookie<'static> {
        self.cookie
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.cookie.name()
    }

    #[must_use]
    pub fn value(&self) -> &str {
        self.cookie.value()
    }

    /// Whether this directive deletes the cookie rather than setting a session.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.cookie.value().is_empty()
    }

    /// The full `Set-Cookie` header value, attributes included.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.cookie.to_string()
    }

    /// Append the `Set-Cookie` header to `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if an attribute (such as the path) contains bytes that
    /// are not allowed in a header value.
    pub fn apply(&self, headers: &mut HeaderMap) -> SessionResult<()> {
        let value = HeaderValue::from_str(&self.header_value())
            .map_err(|err| SessionError::Config(err.to_string()))?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }
}

impl fmt::Display for CookieDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cookie, f)
    }
}
