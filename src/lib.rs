//! Cookie-backed session storage.
//!
//! A [`SessionStore`] turns the `Cookie` header of a request into a [`Session`] and turns a
//! session back into a [`CookieDirective`] (a `Set-Cookie` header). The session travels
//! entirely inside the cookie; there is no server-side state.
//!
//! Every cookie value is authenticated with HMAC-SHA256 under the store's [`Secret`]. With the
//! `private` feature, [`SessionStore::private`] additionally encrypts the values so the client
//! cannot read them.
//!
//! ```no_run
//! use cookie_session_store::{CookieSessionConfig, Secret, SessionStore};
//!
//! # fn main() -> Result<(), cookie_session_store::SessionError> {
//! let store = SessionStore::signed(Secret::generate())
//!     .with_config(CookieSessionConfig::default().with_name("ultimate-web-session"));
//!
//! let mut session = store.load(None).into_session();
//! session.insert("name", "Ada")?;
//! let set_cookie = store.save(&session)?.header_value();
//! # let _ = set_cookie;
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//! A rejected cookie (tampered, foreign secret, expired) behaves exactly like a missing one
//! unless the caller asks otherwise through [`LoadedSession::status`] or
//! [`SessionStore::load_strict`].

mod codec;
mod config;
mod directive;
mod error;
#[cfg(feature = "layer")]
pub mod layer;
mod secret;
mod session;
mod store;

pub use cookie::SameSite;
pub use time::Duration;

pub use crate::codec::{DEFAULT_MAX_TOKEN_BYTES, Protection, SessionCodec, Token};
pub use crate::config::{CookieSessionConfig, DEFAULT_COOKIE_NAME};
pub use crate::directive::CookieDirective;
pub use crate::error::{SessionError, SessionResult};
pub use crate::secret::Secret;
pub use crate::session::Session;
pub use crate::store::{LoadStatus, LoadedSession, SessionStore};

#[cfg(feature = "layer")]
pub use crate::layer::SessionLayer;
