// End-to-end tests using an Axum `Router` whose handlers load and save through a shared
// `SessionStore`. These cover the greet/save flow, cookie persistence across requests and the
// size limit.
mod common;

use http::{StatusCode, header};
use tower::ServiceExt as _;

use cookie_session_store::CookieSessionConfig;

#[tokio::test]
async fn home_without_cookie_asks_for_name() {
    // Exercise: first visit with no cookie.
    // Expectation: the "no saved name" page and no `Set-Cookie`.
    let app = common::name_app(common::make_store(CookieSessionConfig::default()));

    let res = app
        .oneshot(common::home_request(None))
        .await
        .expect("service call succeeds");

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(
        common::body_string(res.into_body()).await,
        common::NO_SESSION_BODY
    );
}

#[tokio::test]
async fn saved_name_is_greeted_on_next_visit() {
    // Exercise: POST a name, then send the issued cookie back to the home page.
    // Expectation: the greeting uses the stored name.
    let app = common::name_app(common::make_store(
        CookieSessionConfig::default().with_secure(false),
    ));

    let res = app
        .clone()
        .oneshot(common::save_request("Ada", None))
        .await
        .expect("service call succeeds");
    assert_eq!(res.status(), StatusCode::OK);
    let session_cookie = common::get_session_cookie_from_headers(res.headers());
    assert_eq!(session_cookie.name(), common::SESSION_NAME);
    assert_eq!(common::body_string(res.into_body()).await, "Hello Ada!");

    let cookie = format!(
        "theme=dark; {}",
        common::cookie_header_value(&session_cookie)
    );
    let res = app
        .oneshot(common::home_request(Some(&cookie)))
        .await
        .expect("service call succeeds");

    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(common::body_string(res.into_body()).await, "Hello Ada!");
}

#[tokio::test]
async fn saving_again_replaces_the_name() {
    // Exercise: save once, then save a different name while sending the first cookie.
    // Expectation: the latest cookie carries the latest name.
    let app = common::name_app(common::make_store(CookieSessionConfig::default()));

    let res = app
        .clone()
        .oneshot(common::save_request("Ada", None))
        .await
        .expect("service call succeeds");
    let first = common::get_session_cookie_from_headers(res.headers());

    let res = app
        .clone()
        .oneshot(common::save_request(
            "Grace",
            Some(&common::cookie_header_value(&first)),
        ))
        .await
        .expect("service call succeeds");
    let second = common::get_session_cookie_from_headers(res.headers());
    assert_ne!(first.value(), second.value());

    let res = app
        .oneshot(common::home_request(Some(&common::cookie_header_value(
            &second,
        ))))
        .await
        .expect("service call succeeds");
    assert_eq!(common::body_string(res.into_body()).await, "Hello Grace!");
}

#[tokio::test]
async fn cookie_from_other_store_is_ignored() {
    // Exercise: a cookie issued under a different secret.
    // Expectation: treated like no cookie at all.
    let issuer = common::name_app(common::make_store(CookieSessionConfig::default()));
    let verifier = common::name_app(common::make_store(CookieSessionConfig::default()));

    let res = issuer
        .oneshot(common::save_request("Ada", None))
        .await
        .expect("service call succeeds");
    let session_cookie = common::get_session_cookie_from_headers(res.headers());

    let res = verifier
        .oneshot(common::home_request(Some(&common::cookie_header_value(
            &session_cookie,
        ))))
        .await
        .expect("service call succeeds");

    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(
        common::body_string(res.into_body()).await,
        common::NO_SESSION_BODY
    );
}

#[tokio::test]
async fn oversized_session_is_a_server_error() {
    // Exercise: save a name too large to fit in the configured cookie budget.
    // Expectation: 500 and no `Set-Cookie`; nothing is silently truncated.
    let app = common::name_app(common::make_store(
        CookieSessionConfig::default().with_max_cookie_bytes(256),
    ));
    let name = "A".repeat(512);

    let res = app
        .oneshot(common::save_request(&name, None))
        .await
        .expect("service call succeeds");

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
}
