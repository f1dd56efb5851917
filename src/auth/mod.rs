//! Account session: login, registration, password reset and logout.
//!
//! The session token is kept in a [`TokenStore`] so it survives reloads; the
//! signed-in user is refetched from the backend on [`AuthController::init`].

pub mod store;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::api::{
    ApiClient, ApiError, AuthClient, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, User,
};
use crate::error::{SiteError, SiteResult};
use crate::page::{AuthView, FormId, Notification, Page};
use crate::sanitize::{is_valid_email, strip_unsafe};

#[derive(Debug, Clone, Default)]
struct AuthState {
    user: Option<User>,
    token: Option<String>,
}

pub struct AuthController {
    api: AuthClient,
    page: Arc<dyn Page>,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<AuthState>,
}

impl AuthController {
    pub fn new(api: &ApiClient, page: Arc<dyn Page>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            api: api.auth(),
            page,
            tokens,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Restore a stored session. A token the backend rejects is dropped.
    pub async fn init(&self) -> SiteResult<()> {
        let token = self.tokens.load()?;
        self.state.lock().await.token = token.clone();

        if let Some(token) = token {
            match self.api.me(&token).await {
                Ok(user) => {
                    info!(user = %user.first_name, "session restored");
                    self.state.lock().await.user = Some(user);
                    self.render().await;
                }
                Err(err) => {
                    warn!("stored session rejected: {err}");
                    self.logout().await?;
                }
            }
        }
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> SiteResult<User> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(self.reject("Invalid email format"));
        }

        let req = LoginRequest {
            email: strip_unsafe(email),
            password: password.to_string(),
        };
        let resp = self
            .api
            .login(&req)
            .await
            .map_err(|err| self.failed(err, "Login failed"))?;

        self.tokens.save(&resp.token)?;
        {
            let mut state = self.state.lock().await;
            state.token = Some(resp.token);
            state.user = Some(resp.user.clone());
        }
        self.page.reset_form(FormId::Login);
        self.render().await;
        self.page.notify(Notification::success("Login successful!"));
        Ok(resp.user)
    }

    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> SiteResult<()> {
        let email = email.trim();
        if first_name.trim().is_empty() || last_name.trim().is_empty() || !is_valid_email(email) {
            return Err(self.reject("Please fill in all fields correctly"));
        }

        let req = RegisterRequest {
            first_name: strip_unsafe(first_name.trim()),
            last_name: strip_unsafe(last_name.trim()),
            email: strip_unsafe(email),
            password: password.to_string(),
        };
        self.api
            .register(&req)
            .await
            .map_err(|err| self.failed(err, "Registration failed"))?;

        self.page.reset_form(FormId::Register);
        self.page
            .notify(Notification::success("Registration successful! Please login."));
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> SiteResult<()> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(self.reject("Invalid email format"));
        }

        let req = ForgotPasswordRequest {
            email: strip_unsafe(email),
        };
        self.api
            .forgot_password(&req)
            .await
            .map_err(|err| self.failed(err, "Failed to send reset link"))?;

        self.page.reset_form(FormId::ForgotPassword);
        self.page
            .notify(Notification::success("Password reset link sent to your email."));
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> SiteResult<()> {
        let req = ResetPasswordRequest {
            token: strip_unsafe(token.trim()),
            new_password: new_password.to_string(),
        };
        self.api
            .reset_password(&req)
            .await
            .map_err(|err| self.failed(err, "Failed to reset password"))?;

        self.page.reset_form(FormId::ResetPassword);
        self.page
            .notify(Notification::success("Password reset successful! Please login."));
        Ok(())
    }

    /// Local state is cleared even when the backend call fails.
    pub async fn logout(&self) -> SiteResult<()> {
        let token = self.state.lock().await.token.take();
        if let Some(token) = token {
            if let Err(err) = self.api.logout(&token).await {
                warn!("logout call failed: {err}");
            }
        }

        self.state.lock().await.user = None;
        let cleared = self.tokens.clear();
        self.render().await;
        self.page.notify(Notification::success("Logged out successfully"));
        cleared
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.lock().await.user.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    pub async fn view(&self) -> AuthView {
        let state = self.state.lock().await;
        match &state.user {
            Some(user) => AuthView {
                signed_in: true,
                display_name: Some(strip_unsafe(&user.first_name)).filter(|n| !n.is_empty()),
                show_admin_controls: user.is_admin(),
            },
            None => AuthView::default(),
        }
    }

    async fn render(&self) {
        let view = self.view().await;
        self.page.render_auth(&view);
    }

    fn reject(&self, message: &str) -> SiteError {
        self.page.notify(Notification::error(message));
        SiteError::Validation(message.to_string())
    }

    fn failed(&self, err: ApiError, fallback: &str) -> SiteError {
        let message = err.server_message().unwrap_or(fallback).to_string();
        warn!("auth request failed: {err}");
        self.page.notify(Notification::error(message));
        SiteError::Api(err)
    }
}

/// Reset token from a page URL: `?token=` first, then `#token=`.
pub fn reset_token_from_url(url: &Url) -> Option<String> {
    let from_query = url
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned());

    from_query
        .or_else(|| {
            let fragment = url.fragment()?.trim_start_matches(['#', '?', '/']);
            url::form_urlencoded::parse(fragment.as_bytes())
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|token| !token.is_empty())
}
