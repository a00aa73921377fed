//! Authentication route handlers.
//!
//! Login, registration and logout against the bookstore API. Tokens end up
//! in the typed session and in the session's API client.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, MessageQuery, Notice, redirect_with, safe_next};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::auth::Shopper;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: SecretString,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
}

/// Where to go after logging in.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(shopper))]
pub async fn login_page(
    shopper: Shopper,
    Query(query): Query<NextQuery>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        layout: Layout::new(&shopper, notices),
        next: safe_next(query.next.as_deref(), "/").to_string(),
    }
}

/// Login page that returns to `next` afterwards.
fn login_path(next: &str) -> String {
    if next == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

/// Handle login form submission.
#[instrument(skip(shopper, form), fields(username = %form.username))]
pub async fn login(mut shopper: Shopper, Form(form): Form<LoginForm>) -> Response {
    let username = form.username.trim();
    let next = safe_next(form.next.as_deref(), "/");
    let retry = login_path(next);

    if username.is_empty() || form.password.expose_secret().is_empty() {
        return redirect_with(
            &retry,
            Notice::Error,
            "Please enter your username and password.",
        )
        .into_response();
    }

    let login = match shopper
        .ctx
        .api()
        .login(username, form.password.expose_secret())
        .await
    {
        Ok(login) => login,
        Err(e) => {
            tracing::info!("Login failed: {e}");
            return redirect_with(&retry, Notice::Error, &e.user_message()).into_response();
        }
    };

    if let Err(e) = shopper.session.sign_in(&login).await {
        tracing::error!("Failed to store login in session: {e}");
        return redirect_with(
            &retry,
            Notice::Error,
            "Something went wrong. Please try again.",
        )
        .into_response();
    }

    shopper.ctx.sign_in(&shopper.session).await;
    set_sentry_user(&login.username);
    tracing::info!(username = %login.username, "Shopper logged in");

    Redirect::to(next).into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(shopper))]
pub async fn register_page(
    shopper: Shopper,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        layout: Layout::new(&shopper, notices),
    }
}

/// Handle registration form submission.
#[instrument(skip(shopper, form), fields(username = %form.username))]
pub async fn register(shopper: Shopper, Form(form): Form<RegisterForm>) -> Response {
    let username = form.username.trim();
    let email = form.email.trim();
    let password = form.password.expose_secret();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return redirect_with(
            "/auth/register",
            Notice::Error,
            "Please fill in every field.",
        )
        .into_response();
    }

    if password != form.password_confirm.expose_secret() {
        return redirect_with("/auth/register", Notice::Error, "Passwords do not match.")
            .into_response();
    }

    match shopper.ctx.api().register(username, email, password).await {
        Ok(()) => redirect_with(
            "/auth/login",
            Notice::Success,
            "Account created. Please log in.",
        )
        .into_response(),
        Err(e) => redirect_with("/auth/register", Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout. Local state is cleared whatever the API answers.
#[instrument(skip(shopper))]
pub async fn logout(mut shopper: Shopper) -> Response {
    if let Some(refresh) = shopper.session.refresh_token().map(str::to_owned)
        && let Err(e) = shopper.ctx.api().logout(&refresh).await
    {
        tracing::warn!("API logout failed: {e}");
    }

    if let Err(e) = shopper.session.sign_out().await {
        tracing::error!("Failed to clear session: {e}");
    }
    shopper.ctx.sign_out().await;
    clear_sentry_user();

    redirect_with("/", Notice::Success, "You have been logged out.").into_response()
}
