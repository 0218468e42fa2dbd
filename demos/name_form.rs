//! Greets a visitor by the name stored in their session cookie, or asks for it.
//!
//! ```text
//! SESSION_SECRET=$(openssl rand -base64 64) cargo run --example name_form
//! ```
use std::net::SocketAddr;

use axum::{
    Extension, Form, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use cookie_session_store::{
    CookieSessionConfig, Duration, LoadedSession, SameSite, Secret, SessionLayer, SessionStore,
};

const SESSION_NAME: &str = "ultimate-web-session";

const NO_SESSION_HTML: &str = r#"
<html>
    <form action="/save" method="POST">
        <label>What is your name?</label><br>
        <input type="text" name="myName" placeholder="Name goes here">
        <input type="submit" value="Submit">
    </form>
</html>"#;

fn with_session_html(name: &str) -> String {
    format!(
        "\n<html>\n    <h1>Hello {}!</h1>\n</html>",
        escape_html(name)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Deserialize)]
struct NameForm {
    #[serde(rename = "myName")]
    my_name: String,
}

async fn home(Extension(loaded): Extension<LoadedSession>) -> Html<String> {
    match loaded.session().get::<String>("name") {
        Ok(Some(name)) => Html(with_session_html(&name)),
        _ => Html(NO_SESSION_HTML.to_string()),
    }
}

async fn save(
    State(store): State<SessionStore>,
    Extension(loaded): Extension<LoadedSession>,
    Form(form): Form<NameForm>,
) -> Response {
    let mut session = loaded.into_session();
    if let Err(err) = session.insert("name", &form.my_name) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    // Set-Cookie must be in place before the body is written.
    let mut headers = HeaderMap::new();
    if let Err(err) = store
        .save(&session)
        .and_then(|directive| directive.apply(&mut headers))
    {
        tracing::error!(err = %err, "session save failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (headers, Html(with_session_html(&form.my_name))).into_response()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let secret = match std::env::var("SESSION_SECRET") {
        Ok(encoded) => Secret::from_base64(&encoded).expect("SESSION_SECRET is a valid secret"),
        Err(_) => {
            tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
            Secret::generate()
        }
    };

    let session_config = CookieSessionConfig::default()
        // Default: "session"
        .with_name(SESSION_NAME)
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Strict
        .with_same_site(SameSite::Lax)
        // Default: None (browser-session cookie, no age limit on the token)
        .with_max_age(Duration::days(7))
        // Default: true (set to false for local HTTP development)
        .with_secure(false)
        // Default: "/"
        .with_path("/")
        // Default: None
        .without_domain()
        // Default: 4000
        .with_max_cookie_bytes(4000)
        // Default: false
        .with_clear_on_decode_error(false);
    let store = SessionStore::signed(secret).with_config(session_config);

    let app = Router::new()
        .route("/", get(home))
        .route("/save", post(save))
        .layer(SessionLayer::new(store.clone()))
        .with_state(store);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    tracing::info!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
