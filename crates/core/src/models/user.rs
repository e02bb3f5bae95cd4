use serde::{Deserialize, Serialize};

/// Identity record of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,

    /// Optional display name chosen at registration
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub verified: bool,

    /// Creation/update timestamps as reported by the backend (opaque strings)
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl User {
    /// Name to greet the user with: the username if set, the email otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.email)
    }
}

/// Token plus identity issued by the backend after authentication.
///
/// This is what gets persisted between runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Data sent to create an account.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub username: Option<String>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Observable state of the session, published to subscribers on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Current identity, `None` when logged out
    pub user: Option<User>,

    /// True while a session operation is in flight (and at boot until `check_auth` ran)
    pub is_loading: bool,

    /// Displayable message of the last failed login/registration
    pub error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
            error: None,
        }
    }
}
