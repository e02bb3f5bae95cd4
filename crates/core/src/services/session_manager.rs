use chrono::Utc;
use email_address::EmailAddress;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::traits::RecordStore;
use crate::errors::CoreError;
use crate::models::user::{Credential, NewAccount, SessionState, User};
use crate::storage::credentials::CredentialStore;
use crate::storage::token;

/// Minimum password length accepted at registration (in characters).
pub const MIN_PASSWORD_LEN: usize = 8;

/// Owns the authentication state: the credential, the current identity and
/// the loading/error status shown to the user.
///
/// Explicit failures (login, registration) are returned and recorded in
/// [`SessionState::error`]. Background invalidation (expired or revoked
/// token at start-up or during a reload) is silent: the session simply
/// becomes absent.
pub struct SessionManager {
    backend: Arc<dyn RecordStore>,
    credentials: Box<dyn CredentialStore>,
    credential: Option<Credential>,
    current: SessionState,
    notifier: watch::Sender<SessionState>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("backend", &self.backend.name())
            .field("has_credential", &self.credential.is_some())
            .field("state", &self.current)
            .finish()
    }
}

impl SessionManager {
    /// Create the manager and pick up any credential persisted by a previous run.
    /// The session stays absent (and loading) until [`check_auth`](Self::check_auth) validates it.
    pub fn new(backend: Arc<dyn RecordStore>, credentials: Box<dyn CredentialStore>) -> Self {
        let credential = match credentials.load() {
            Ok(credential) => credential,
            Err(e) => {
                warn!("ignoring unreadable persisted credential: {e}");
                None
            }
        };
        let current = SessionState::default();
        let (notifier, _) = watch::channel(current.clone());

        Self {
            backend,
            credentials,
            credential,
            current,
            notifier,
        }
    }

    // ── Observation ─────────────────────────────────────────────────

    /// Receive every state change. The new state is published before the
    /// operation that caused it returns.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.notifier.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.current
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.current.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.current.is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.current.error.as_deref()
    }

    /// True when a credential is held, whether or not it was validated yet.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Log in with email and password.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, CoreError> {
        self.begin();
        let result = self.login_inner(email, password).await;
        self.finish(result)
    }

    async fn login_inner(&mut self, email: &str, password: &str) -> Result<User, CoreError> {
        let email = validate_email(email)?;
        if password.is_empty() {
            return Err(CoreError::Validation("password is required".into()));
        }

        let credential = self.backend.authenticate(email, password).await?;
        Ok(self.establish(credential))
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// Password rules are checked locally before anything is sent.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        password_confirm: &str,
        username: Option<&str>,
    ) -> Result<User, CoreError> {
        self.begin();
        let result = self
            .register_inner(email, password, password_confirm, username)
            .await;
        self.finish(result)
    }

    async fn register_inner(
        &mut self,
        email: &str,
        password: &str,
        password_confirm: &str,
        username: Option<&str>,
    ) -> Result<User, CoreError> {
        let email = validate_email(email)?;
        if password != password_confirm {
            return Err(CoreError::Validation("passwords do not match".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }

        let account = NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            password_confirm: password_confirm.to_string(),
            username: username
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        };
        let created = self.backend.create_account(&account).await?;
        info!(user_id = %created.id, "account created");

        let credential = self.backend.authenticate(email, password).await?;
        Ok(self.establish(credential))
    }

    /// Forget the credential and the identity. Always succeeds locally.
    pub fn logout(&mut self) {
        self.drop_credential();
        self.publish(SessionState {
            user: None,
            is_loading: false,
            error: None,
        });
        info!("logged out");
    }

    /// Validate the persisted credential against the backend, typically once at start-up.
    ///
    /// An invalid, expired or rejected credential is cleared without
    /// recording an error: it just means nobody is logged in.
    pub async fn check_auth(&mut self) {
        self.begin();

        let Some(credential) = self.credential.clone() else {
            self.publish_absent();
            return;
        };

        if !token::is_token_valid(&credential.token, Utc::now()) {
            debug!("persisted token expired");
            self.drop_credential();
            self.publish_absent();
            return;
        }

        match self.backend.refresh(&credential.token).await {
            Ok(fresh) => {
                let user = self.establish(fresh);
                info!(user_id = %user.id, "session restored");
                self.publish(SessionState {
                    user: Some(user),
                    is_loading: false,
                    error: None,
                });
            }
            Err(e) => {
                debug!("token refresh rejected: {e}");
                self.drop_credential();
                self.publish_absent();
            }
        }
    }

    /// The held credential if its token has not expired.
    ///
    /// An expired token is dropped on the spot, silently, exactly like
    /// [`expire`](Self::expire).
    pub fn valid_credential(&mut self) -> Option<&Credential> {
        let valid = self
            .credential
            .as_ref()
            .map(|c| token::is_token_valid(&c.token, Utc::now()))?;
        if !valid {
            self.expire();
            return None;
        }
        self.credential.as_ref()
    }

    /// Silently invalidate the session after the backend refused its token.
    pub fn expire(&mut self) {
        if self.credential.is_none() && !self.current.is_authenticated() {
            return;
        }
        info!("session expired");
        self.drop_credential();
        self.publish_absent();
    }

    // ── Internals ───────────────────────────────────────────────────

    fn establish(&mut self, credential: Credential) -> User {
        if let Err(e) = self.credentials.save(&credential) {
            warn!("could not persist credential, session will not survive a restart: {e}");
        }
        let user = credential.user.clone();
        self.credential = Some(credential);
        user
    }

    fn drop_credential(&mut self) {
        if let Err(e) = self.credentials.clear() {
            warn!("could not clear persisted credential: {e}");
        }
        self.credential = None;
    }

    fn begin(&mut self) {
        self.publish(SessionState {
            user: self.current.user.clone(),
            is_loading: true,
            error: None,
        });
    }

    fn finish(&mut self, result: Result<User, CoreError>) -> Result<User, CoreError> {
        match &result {
            Ok(user) => {
                info!(user_id = %user.id, "logged in");
                self.publish(SessionState {
                    user: Some(user.clone()),
                    is_loading: false,
                    error: None,
                });
            }
            Err(e) => {
                warn!("session operation failed: {e}");
                self.publish(SessionState {
                    user: self.current.user.clone(),
                    is_loading: false,
                    error: Some(e.to_string()),
                });
            }
        }
        result
    }

    fn publish_absent(&mut self) {
        self.publish(SessionState {
            user: None,
            is_loading: false,
            error: None,
        });
    }

    fn publish(&mut self, next: SessionState) {
        if next == self.current {
            return;
        }
        if next.is_authenticated() != self.current.is_authenticated() {
            debug!(authenticated = next.is_authenticated(), "session identity changed");
        }
        self.current = next.clone();
        self.notifier.send_replace(next);
    }
}

/// Trimmed email if it is a well-formed address.
fn validate_email(email: &str) -> Result<&str, CoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CoreError::Validation("email is required".into()));
    }
    if !EmailAddress::is_valid(email) {
        return Err(CoreError::Validation(format!("'{email}' is not a valid email address")));
    }
    Ok(email)
}
