//! Authentication route handlers.
//!
//! Signup, password login, logout and the password reset flow. Failures
//! redirect back to the form with an `?error=` code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use super::{MessageQuery, with_error, with_success};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Password reset request form data.
#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    pub email: String,
}

/// New password form data.
#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
}

/// Password reset request page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// New password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    pub error: Option<String>,
    pub token: String,
    pub email: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn start_session(session: &Session, user: &User) -> Result<(), Response> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    };

    if let Err(e) = set_current_user(session, &current).await {
        error!(error = %e, "Failed to store session");
        return Err(Redirect::to(&with_error("/login", "session")).into_response());
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Signup
// =============================================================================

/// Display the signup page.
pub async fn signup_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    SignupTemplate {
        error: query.error_text(),
    }
    .into_response()
}

/// Handle signup: create the account, log it in, send a welcome email.
#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Response {
    if form.password != form.confirm_password {
        return Redirect::to(&with_error("/signup", "password_mismatch")).into_response();
    }

    let user = match AuthService::new(state.pool())
        .register_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            let code = match e {
                AuthError::UserAlreadyExists => "email_taken",
                AuthError::InvalidEmail(_) => "invalid_email",
                AuthError::WeakPassword(_) => "password_too_short",
                other => {
                    error!(error = %other, "Signup failed");
                    "failed"
                }
            };
            return Redirect::to(&with_error("/signup", code)).into_response();
        }
    };

    if let Some(mailer) = state.email() {
        if let Err(e) = mailer
            .send_welcome_email(user.email.as_str(), &user.name)
            .await
        {
            warn!(user_id = %user.id, error = %e, "Welcome email failed");
        }
    } else {
        warn!("SMTP not configured, skipping welcome email");
    }

    if let Err(response) = start_session(&session, &user).await {
        return response;
    }
    Redirect::to("/dashboard").into_response()
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    LoginTemplate {
        error: query.error_text(),
        success: query.success_text(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(state.pool())
        .login_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            if let Err(response) = start_session(&session, &user).await {
                return response;
            }
            info!(user_id = %user.id, "User logged in");
            Redirect::to("/dashboard").into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            Redirect::to(&with_error("/login", "credentials")).into_response()
        }
        Err(e) => {
            error!(error = %e, "Login failed");
            Redirect::to(&with_error("/login", "failed")).into_response()
        }
    }
}

/// Destroy the session and return to the login page.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        warn!(error = %e, "Failed to destroy session");
    }
    clear_sentry_user();
    Redirect::to("/login")
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the reset request page.
pub async fn reset_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    ResetTemplate {
        error: query.error_text(),
        success: query.success_text(),
    }
}

/// Handle a reset request.
///
/// Always answers with the same redirect so the form cannot be used to find
/// out which addresses have accounts.
#[instrument(skip(state, form))]
pub async fn request_reset(
    State(state): State<AppState>,
    Form(form): Form<ResetRequestForm>,
) -> Redirect {
    match AuthService::new(state.pool())
        .request_password_reset(&form.email)
        .await
    {
        Ok(Some(ticket)) => match state.email() {
            Some(mailer) => {
                if let Err(e) = mailer
                    .send_password_reset_email(
                        ticket.user.email.as_str(),
                        &ticket.user.name,
                        &ticket.token,
                    )
                    .await
                {
                    warn!(user_id = %ticket.user.id, error = %e, "Reset email failed");
                }
            }
            None => warn!("SMTP not configured, skipping password reset email"),
        },
        Ok(None) | Err(AuthError::InvalidEmail(_)) => {}
        Err(e) => error!(error = %e, "Password reset request failed"),
    }

    Redirect::to(&with_success("/reset", "reset_sent"))
}

/// Display the new password form for a valid token.
pub async fn new_password_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Response {
    match AuthService::new(state.pool()).verify_reset_token(&token).await {
        Ok(user) => NewPasswordTemplate {
            error: query.error_text(),
            token,
            email: user.email.to_string(),
        }
        .into_response(),
        Err(AuthError::InvalidResetToken) => {
            Redirect::to(&with_error("/reset", "invalid_reset_link")).into_response()
        }
        Err(e) => {
            error!(error = %e, "Reset token lookup failed");
            Redirect::to(&with_error("/reset", "failed")).into_response()
        }
    }
}

/// Set a new password and send the user to the login page.
#[instrument(skip(state, form))]
pub async fn new_password(
    State(state): State<AppState>,
    Form(form): Form<NewPasswordForm>,
) -> Redirect {
    let retry = format!("/reset/{}", urlencoding::encode(&form.token));

    match AuthService::new(state.pool())
        .reset_password(&form.token, &form.password, &form.confirm_password)
        .await
    {
        Ok(_) => Redirect::to(&with_success("/login", "password_updated")),
        Err(AuthError::PasswordMismatch) => Redirect::to(&with_error(&retry, "password_mismatch")),
        Err(AuthError::WeakPassword(_)) => Redirect::to(&with_error(&retry, "password_too_short")),
        Err(AuthError::InvalidResetToken) => {
            Redirect::to(&with_error("/reset", "invalid_reset_link"))
        }
        Err(e) => {
            error!(error = %e, "Password reset failed");
            Redirect::to(&with_error(&retry, "failed"))
        }
    }
}
