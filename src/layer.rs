//! `tower` middleware that loads the inbound session for every request.
//!
//! The service inserts a [`LoadedSession`] into the request extensions. It never saves: the
//! handler decides whether to call [`SessionStore::save`] and attaches the directive itself.
//! The only header the middleware writes is the optional cleanup cookie for a rejected
//! inbound session, and only if the handler did not already set the session cookie.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use cookie::Cookie;
use http::{HeaderMap, Request, Response, header};
use tower_layer::Layer;
use tower_service::Service;

use crate::{directive::CookieDirective, store::LoadedSession, store::SessionStore};

#[derive(Debug, Clone)]
pub struct SessionLayer {
    store: SessionStore,
}

impl SessionLayer {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }
}

#[derive(Debug, Clone)]
pub struct SessionService<S> {
    inner: S,
    store: SessionStore,
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            store: self.store.clone(),
        }
    }
}

impl<ReqBody, ResBody, S> Service<Request<ReqBody>> for SessionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let loaded = self.store.load_from_headers(req.headers());
        let cleanup = loaded.cleanup().cloned();
        req.extensions_mut().insert::<LoadedSession>(loaded);

        Box::pin(async move {
            let mut res = inner.call(req).await?;

            if let Some(cleanup) = cleanup
                && !sets_cookie(res.headers(), cleanup.name())
            {
                apply_cleanup(&cleanup, res.headers_mut());
            }

            Ok(res)
        })
    }
}

fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value).ok())
        .any(|cookie| cookie.name() == name)
}

fn apply_cleanup(cleanup: &CookieDirective, headers: &mut HeaderMap) {
    if let Err(err) = cleanup.apply(headers) {
        tracing::error!(err = %err, "session cookie cleanup failed");
    }
}
