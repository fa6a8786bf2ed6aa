//! Authentication against an external identity service
//!
//! The identity service owns credentials; this module maps its error codes to
//! user-facing text and keeps the signed-in session in an explicit
//! [`AuthContext`] that views receive by reference.

use crate::error::{Error, Result};
use crate::store::{PushKeys, RealtimeStore};
use crate::users::UserDirectory;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Id tokens are exchanged this long before they expire.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// How often a signed-in client checks its id token.
pub const TOKEN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

// ============================================================================
// Error codes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    NetworkRequestFailed,
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    InvalidCredential,
    TooManyRequests,
    UserDisabled,
    OperationNotAllowed,
    InvalidVerificationCode,
    InvalidVerificationId,
    MissingEmail,
    MissingPassword,
    EmailAlreadyInUse,
    WeakPassword,
    Other(String),
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            AuthErrorCode::NetworkRequestFailed => "auth/network-request-failed",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::InvalidCredential => "auth/invalid-credential",
            AuthErrorCode::TooManyRequests => "auth/too-many-requests",
            AuthErrorCode::UserDisabled => "auth/user-disabled",
            AuthErrorCode::OperationNotAllowed => "auth/operation-not-allowed",
            AuthErrorCode::InvalidVerificationCode => "auth/invalid-verification-code",
            AuthErrorCode::InvalidVerificationId => "auth/invalid-verification-id",
            AuthErrorCode::MissingEmail => "auth/missing-email",
            AuthErrorCode::MissingPassword => "auth/missing-password",
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::Other(code) => code,
        }
    }

    /// Parse a provider code such as `auth/wrong-password`.
    pub fn parse(code: &str) -> Self {
        match code {
            "auth/network-request-failed" => AuthErrorCode::NetworkRequestFailed,
            "auth/invalid-email" => AuthErrorCode::InvalidEmail,
            "auth/user-not-found" => AuthErrorCode::UserNotFound,
            "auth/wrong-password" => AuthErrorCode::WrongPassword,
            "auth/invalid-credential" => AuthErrorCode::InvalidCredential,
            "auth/too-many-requests" => AuthErrorCode::TooManyRequests,
            "auth/user-disabled" => AuthErrorCode::UserDisabled,
            "auth/operation-not-allowed" => AuthErrorCode::OperationNotAllowed,
            "auth/invalid-verification-code" => AuthErrorCode::InvalidVerificationCode,
            "auth/invalid-verification-id" => AuthErrorCode::InvalidVerificationId,
            "auth/missing-email" => AuthErrorCode::MissingEmail,
            "auth/missing-password" => AuthErrorCode::MissingPassword,
            "auth/email-already-in-use" => AuthErrorCode::EmailAlreadyInUse,
            "auth/weak-password" => AuthErrorCode::WeakPassword,
            other => AuthErrorCode::Other(other.to_string()),
        }
    }

    /// Translate an Identity Toolkit REST error message
    /// (`"WEAK_PASSWORD : Password should be at least 6 characters"`).
    pub fn from_rest(message: &str) -> Self {
        let reason = message.split(" : ").next().unwrap_or_default().trim();
        match reason {
            "EMAIL_NOT_FOUND" => AuthErrorCode::UserNotFound,
            "INVALID_PASSWORD" => AuthErrorCode::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => {
                AuthErrorCode::InvalidCredential
            }
            "USER_DISABLED" => AuthErrorCode::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorCode::TooManyRequests,
            "EMAIL_EXISTS" => AuthErrorCode::EmailAlreadyInUse,
            "WEAK_PASSWORD" => AuthErrorCode::WeakPassword,
            "INVALID_EMAIL" => AuthErrorCode::InvalidEmail,
            "MISSING_EMAIL" => AuthErrorCode::MissingEmail,
            "MISSING_PASSWORD" => AuthErrorCode::MissingPassword,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => {
                AuthErrorCode::OperationNotAllowed
            }
            "INVALID_CODE" => AuthErrorCode::InvalidVerificationCode,
            "INVALID_SESSION_INFO" => AuthErrorCode::InvalidVerificationId,
            other => AuthErrorCode::Other(format!(
                "auth/{}",
                other.to_ascii_lowercase().replace('_', "-")
            )),
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    SignIn,
    SignUp,
}

/// User-facing text for a provider error.
pub fn auth_error_message(code: &AuthErrorCode, op: AuthOperation) -> &'static str {
    use AuthErrorCode::*;

    match (code, op) {
        (NetworkRequestFailed, _) => "Network error. Please check your internet connection.",
        (InvalidEmail, _) => "Invalid email address. Please enter a valid email.",
        (MissingEmail, _) => "Email is required.",
        (MissingPassword, _) => "Password is required.",
        (InvalidVerificationCode, _) => "Invalid verification code.",
        (InvalidVerificationId, _) => "Invalid verification ID.",

        (UserNotFound, AuthOperation::SignIn) => "No account found with this email address.",
        (WrongPassword, AuthOperation::SignIn) => "Incorrect password. Please try again.",
        (InvalidCredential, AuthOperation::SignIn) => {
            "Invalid email or password. Please check your credentials."
        }
        (TooManyRequests, AuthOperation::SignIn) => {
            "Too many failed attempts. Please try again later."
        }
        (UserDisabled, AuthOperation::SignIn) => {
            "This account has been disabled. Please contact support."
        }
        (OperationNotAllowed, AuthOperation::SignIn) => {
            "Sign in is currently disabled. Please contact support."
        }

        (EmailAlreadyInUse, AuthOperation::SignUp) => {
            "An account with this email already exists. Please sign in instead."
        }
        (WeakPassword, AuthOperation::SignUp) => {
            "Password is too weak. Please use at least 6 characters."
        }
        (OperationNotAllowed, AuthOperation::SignUp) => {
            "Sign up is currently disabled. Please contact support."
        }

        (_, AuthOperation::SignIn) => "Failed to sign in. Please try again.",
        (_, AuthOperation::SignUp) => "Failed to sign up. Please try again.",
    }
}

/// Build an [`Error::Auth`] carrying the mapped message.
pub fn auth_error(code: AuthErrorCode, op: AuthOperation) -> Error {
    let message = auth_error_message(&code, op).to_string();
    Error::Auth { code, message }
}

/// Message shown when the auth state observer itself fails. Only network
/// failures are surfaced; everything else is left to the sign-in form.
pub fn auth_state_error_message(code: &AuthErrorCode) -> Option<&'static str> {
    match code {
        AuthErrorCode::NetworkRequestFailed => Some(
            "Network error: Please check your internet connection and Firebase configuration.",
        ),
        _ => None,
    }
}

fn validate_credentials(email: &str, password: &str, op: AuthOperation) -> Result<()> {
    if email.trim().is_empty() {
        return Err(auth_error(AuthErrorCode::MissingEmail, op));
    }
    if password.is_empty() {
        return Err(auth_error(AuthErrorCode::MissingPassword, op));
    }
    Ok(())
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthUser {
    /// Name used as `senderName` and in call overlays.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("User")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub id_token: String,
    pub refresh_token: String,
    /// Milliseconds since the epoch.
    pub expires_at: i64,
}

impl AuthSession {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession>;

    /// Exchange the refresh token of `session` for a new id token.
    async fn refresh(&self, _session: &AuthSession) -> Result<AuthSession> {
        Err(Error::NotSignedIn)
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Identity Toolkit REST provider
// ============================================================================

pub struct FirebaseIdentity {
    http: Client,
    base_url: String,
    token_url: String,
    api_key: String,
}

impl FirebaseIdentity {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Secure Token service root, used for refreshing id tokens.
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.trim_end_matches('/').to_string();
        self
    }

    async fn call(&self, method: &str, body: Value, op: AuthOperation) -> Result<Value> {
        let request = self
            .http
            .post(format!("{}/accounts:{}", self.base_url, method))
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        self.send(method, request, op).await
    }

    async fn send(&self, method: &str, request: RequestBuilder, op: AuthOperation) -> Result<Value> {
        let resp = request
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(method, error = %e, "Identity request failed");
                auth_error(AuthErrorCode::NetworkRequestFailed, op)
            })?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|_| auth_error(AuthErrorCode::NetworkRequestFailed, op))?;

        if !status.is_success() {
            let message = data["error"]["message"].as_str().unwrap_or_default();
            let code = AuthErrorCode::from_rest(message);
            tracing::info!(method, code = %code, "Identity service rejected request");
            return Err(auth_error(code, op));
        }

        Ok(data)
    }

    fn session_from(data: &Value) -> AuthSession {
        let text = |name: &str| {
            data[name]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let expires_in: i64 = data["expiresIn"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        AuthSession {
            user: AuthUser {
                uid: text("localId").unwrap_or_default(),
                display_name: text("displayName"),
                email: text("email"),
                photo_url: text("photoUrl"),
            },
            id_token: text("idToken").unwrap_or_default(),
            refresh_token: text("refreshToken").unwrap_or_default(),
            expires_at: chrono::Utc::now().timestamp_millis() + expires_in * 1000,
        }
    }

    /// Secure Token responses carry snake_case fields and no profile.
    fn refreshed_from(previous: &AuthSession, data: &Value) -> AuthSession {
        let text = |name: &str| {
            data[name]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let expires_in: i64 = data["expires_in"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        AuthSession {
            user: previous.user.clone(),
            id_token: text("id_token").unwrap_or_default(),
            refresh_token: text("refresh_token").unwrap_or_else(|| previous.refresh_token.clone()),
            expires_at: chrono::Utc::now().timestamp_millis() + expires_in * 1000,
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let op = AuthOperation::SignIn;
        validate_credentials(email, password, op)?;

        let data = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
                op,
            )
            .await?;
        Ok(Self::session_from(&data))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession> {
        let op = AuthOperation::SignUp;
        validate_credentials(email, password, op)?;

        let data = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
                op,
            )
            .await?;
        let mut session = Self::session_from(&data);

        if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
            let update = json!({
                "idToken": session.id_token,
                "displayName": name.trim(),
                "returnSecureToken": false,
            });
            match self.call("update", update, op).await {
                Ok(_) => session.user.display_name = Some(name.trim().to_string()),
                Err(e) => tracing::warn!(error = %e, "Failed to set display name"),
            }
        }

        Ok(session)
    }

    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession> {
        if session.refresh_token.is_empty() {
            return Err(Error::NotSignedIn);
        }

        let request = self
            .http
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ]);
        let data = self.send("token", request, AuthOperation::SignIn).await?;

        let fresh = Self::refreshed_from(session, &data);
        if fresh.id_token.is_empty() {
            return Err(Error::Auth {
                code: AuthErrorCode::Other("auth/invalid-user-token".into()),
                message: SESSION_EXPIRED.to_string(),
            });
        }
        Ok(fresh)
    }
}

// ============================================================================
// In-memory provider
// ============================================================================

struct LocalAccount {
    password: String,
    user: AuthUser,
}

/// Offline provider with the same validation and error codes as the
/// remote service.
#[derive(Default)]
pub struct LocalIdentity {
    accounts: Mutex<HashMap<String, LocalAccount>>,
    uids: PushKeys,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(user: &AuthUser) -> AuthSession {
        AuthSession {
            user: user.clone(),
            id_token: format!("local-{}", user.uid),
            refresh_token: String::new(),
            expires_at: i64::MAX,
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let op = AuthOperation::SignIn;
        validate_credentials(email, password, op)?;

        let accounts = self.accounts.lock();
        let account = accounts
            .get(&email.trim().to_lowercase())
            .ok_or_else(|| auth_error(AuthErrorCode::UserNotFound, op))?;
        if account.password != password {
            return Err(auth_error(AuthErrorCode::WrongPassword, op));
        }
        Ok(Self::session(&account.user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthSession> {
        let op = AuthOperation::SignUp;
        validate_credentials(email, password, op)?;

        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(auth_error(AuthErrorCode::InvalidEmail, op));
        }
        if password.len() < 6 {
            return Err(auth_error(AuthErrorCode::WeakPassword, op));
        }

        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&email) {
            return Err(auth_error(AuthErrorCode::EmailAlreadyInUse, op));
        }

        let user = AuthUser {
            uid: format!("local-{}", self.uids.next(chrono::Utc::now().timestamp_millis())),
            display_name: display_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            email: Some(email.clone()),
            photo_url: None,
        };
        let session = Self::session(&user);
        accounts.insert(
            email,
            LocalAccount {
                password: password.to_string(),
                user,
            },
        );
        Ok(session)
    }
}

// ============================================================================
// Session context
// ============================================================================

#[derive(Default)]
struct AuthState {
    session: Option<AuthSession>,
    error: Option<String>,
}

/// The signed-in session, shared with every view that needs the user.
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn RealtimeStore>,
    users: UserDirectory,
    state: RwLock<AuthState>,
    updates: watch::Sender<Option<AuthUser>>,
}

impl AuthContext {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn RealtimeStore>) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            users: UserDirectory::new(store.clone()),
            provider,
            store,
            state: RwLock::new(AuthState::default()),
            updates,
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.read().session.as_ref().map(|s| s.user.clone())
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.state.read().session.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.read().session.is_some()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Observe sign-in and sign-out.
    pub fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.updates.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        match self.provider.sign_in(email, password).await {
            Ok(session) => Ok(self.enter(session).await),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser> {
        match self.provider.sign_up(email, password, display_name).await {
            Ok(session) => Ok(self.enter(session).await),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Re-enter a session cached from a previous run. An expired id token
    /// is exchanged first.
    pub async fn restore(&self, session: AuthSession) -> Result<AuthUser> {
        let session = if session.is_expired(chrono::Utc::now().timestamp_millis()) {
            if session.refresh_token.is_empty() {
                return Err(Error::NotSignedIn);
            }
            self.provider.refresh(&session).await.map_err(|e| {
                tracing::info!(user_id = %session.user.uid, error = %e, "Cached session could not be refreshed");
                Error::NotSignedIn
            })?
        } else {
            session
        };
        Ok(self.enter(session).await)
    }

    /// Exchange the id token when it is within [`REFRESH_MARGIN`] of expiry.
    ///
    /// Returns whether a new token was installed. A network failure keeps
    /// the session and is reported like an auth state error; any other
    /// failure ends the session.
    pub async fn refresh_if_needed(&self) -> Result<bool> {
        let Some(session) = self.session() else {
            return Ok(false);
        };
        let margin = REFRESH_MARGIN.as_millis() as i64;
        if session.expires_at.saturating_sub(margin) > chrono::Utc::now().timestamp_millis() {
            return Ok(false);
        }

        match self.provider.refresh(&session).await {
            Ok(fresh) => {
                {
                    let mut state = self.state.write();
                    // Signed out or switched user while the request was in flight.
                    if state.session.as_ref().map(|s| s.refresh_token.as_str())
                        != Some(session.refresh_token.as_str())
                    {
                        return Ok(false);
                    }
                    self.store.authorize(Some(fresh.id_token.clone()));
                    state.session = Some(fresh);
                    state.error = None;
                }
                tracing::debug!(user_id = %session.user.uid, "Id token refreshed");
                self.updates.send_replace(Some(session.user));
                Ok(true)
            }
            Err(e) => {
                if let Error::Auth { code: code @ AuthErrorCode::NetworkRequestFailed, .. } = &e {
                    self.report_state_error(code);
                    self.updates.send_replace(Some(session.user));
                } else {
                    tracing::warn!(user_id = %session.user.uid, error = %e, "Token refresh rejected");
                    self.expire();
                }
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        let result = self.provider.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Identity sign-out failed");
        }

        self.store.authorize(None);
        *self.state.write() = AuthState::default();
        self.updates.send_replace(None);
        tracing::info!("Signed out");
        result
    }

    /// Record a failure reported by the auth state observer.
    pub fn report_state_error(&self, code: &AuthErrorCode) {
        tracing::error!(code = %code, "Auth state error");
        if let Some(message) = auth_state_error_message(code) {
            self.state.write().error = Some(message.to_string());
        }
    }

    fn expire(&self) {
        self.store.authorize(None);
        *self.state.write() = AuthState {
            session: None,
            error: Some(SESSION_EXPIRED.to_string()),
        };
        self.updates.send_replace(None);
    }

    async fn enter(&self, session: AuthSession) -> AuthUser {
        let user = session.user.clone();
        self.store.authorize(Some(session.id_token.clone()));
        {
            let mut state = self.state.write();
            state.session = Some(session);
            state.error = None;
        }

        if let Err(e) = self
            .users
            .create_or_update_profile(
                &user.uid,
                user.display_name.as_deref(),
                user.email.as_deref(),
                user.photo_url.as_deref(),
            )
            .await
        {
            tracing::warn!(user_id = %user.uid, error = %e, "Failed to update user profile");
        }

        tracing::info!(user_id = %user.uid, "Signed in");
        self.updates.send_replace(Some(user.clone()));
        user
    }

    fn fail(&self, error: Error) -> Error {
        self.state.write().error = Some(error.to_string());
        error
    }
}
