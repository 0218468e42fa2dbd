#![allow(dead_code)]

// Shared helpers for integration tests.
//
// Cookies are parsed with `cookie::Cookie` to match what the store emits in `Set-Cookie` and
// what browsers send back in `Cookie`.
use axum::{
    Router,
    body::Body,
    extract::{Form, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use cookie::Cookie;
use http::header;
use http_body_util::BodyExt as _;
use serde::Deserialize;

use cookie_session_store::{CookieSessionConfig, Secret, SessionStore};

pub const SESSION_NAME: &str = "ultimate-web-session";

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn make_store(config: CookieSessionConfig) -> SessionStore {
    SessionStore::signed(Secret::generate()).with_config(config.with_name(SESSION_NAME))
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    // Parse the `Set-Cookie` header into a `Cookie` structure.
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Render a cookie for use in a `Cookie` request header.
    cookie.stripped().to_string()
}

pub fn tamper_cookie_value(cookie: &mut Cookie<'_>) {
    // Flip the last character to a different base64url character.
    let mut value = cookie.value().to_string();
    let last = value
        .pop()
        .expect("cookie value has at least one character");
    let replacement = if last == 'A' { 'B' } else { 'A' };
    value.push(replacement);
    cookie.set_value(value);
}

#[derive(Deserialize)]
pub struct NameForm {
    #[serde(rename = "myName")]
    pub my_name: String,
}

pub const NO_SESSION_BODY: &str = "What is your name?";

async fn home(State(store): State<SessionStore>, headers: HeaderMap) -> Html<String> {
    let session = store.load_from_headers(&headers).into_session();
    match session.get::<String>("name").ok().flatten() {
        Some(name) => Html(format!("Hello {name}!")),
        None => Html(NO_SESSION_BODY.to_string()),
    }
}

async fn save(
    State(store): State<SessionStore>,
    headers: HeaderMap,
    Form(form): Form<NameForm>,
) -> Response {
    let mut session = store.load_from_headers(&headers).into_session();
    if session.insert("name", &form.my_name).is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    // The cookie goes into the headers before the body is produced.
    let mut response_headers = HeaderMap::new();
    let applied = store
        .save(&session)
        .and_then(|directive| directive.apply(&mut response_headers));
    if applied.is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (response_headers, Html(format!("Hello {}!", form.my_name))).into_response()
}

pub fn name_app(store: SessionStore) -> Router {
    // The home/save pair: greet by the name stored in the session, or ask for it.
    Router::new()
        .route("/", get(home))
        .route("/save", post(save))
        .with_state(store)
}

pub fn save_request(name: &str, cookie: Option<&str>) -> http::Request<Body> {
    let mut builder = http::Request::builder()
        .method(http::Method::POST)
        .uri("/save")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(format!("myName={name}")))
        .expect("request builds successfully")
}

pub fn home_request(cookie: Option<&str>) -> http::Request<Body> {
    let mut builder = http::Request::builder().uri("/");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::empty())
        .expect("request builds successfully")
}
