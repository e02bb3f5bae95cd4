pub mod backend;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use backend::pocketbase::PocketBaseStore;
use backend::traits::RecordStore;
use errors::CoreError;
use models::{
    category::CategoryTotal,
    settings::Settings,
    transaction::{Transaction, TransactionInput, TypeFilter},
    user::{SessionState, User},
};
use services::{session_manager::SessionManager, transaction_store::TransactionStore};
#[cfg(not(target_arch = "wasm32"))]
use storage::credentials::FileCredentialStore;
use storage::credentials::{CredentialStore, MemoryCredentialStore};

/// Main entry point for the Financiary core library.
///
/// Constructed once at application start, it owns the session and the
/// transaction list and keeps them consistent: whenever the session goes
/// away the list is cleared, whenever it is (re)established the list is
/// reloaded. Callers read derived values from here and never compute
/// aggregates themselves.
#[must_use]
pub struct Financiary {
    session: SessionManager,
    store: TransactionStore,
}

impl std::fmt::Debug for Financiary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Financiary")
            .field("session", &self.session)
            .field("store", &self.store)
            .finish()
    }
}

impl Financiary {
    /// Build against a PocketBase server as described by `settings`.
    ///
    /// The credential is persisted to `settings.credentials_path` when set
    /// (native only), kept in memory otherwise.
    pub fn connect(settings: &Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        let backend = Arc::new(PocketBaseStore::new(&settings.remote)?);

        let credentials: Box<dyn CredentialStore> = match &settings.credentials_path {
            #[cfg(not(target_arch = "wasm32"))]
            Some(path) => Box::new(FileCredentialStore::new(path.clone())),
            _ => Box::new(MemoryCredentialStore::new()),
        };

        Ok(Self::with_backend(backend, credentials))
    }

    /// Build against any record store; one backend handle is shared by the
    /// session and the transaction store.
    pub fn with_backend(
        backend: Arc<dyn RecordStore>,
        credentials: Box<dyn CredentialStore>,
    ) -> Self {
        let session = SessionManager::new(Arc::clone(&backend), credentials);
        let store = TransactionStore::new(backend);
        Self { session, store }
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Restore the persisted session, if still valid, and load its transactions.
    pub async fn start(&mut self) {
        self.session.check_auth().await;
        self.sync_store().await;
    }

    /// Log in and load the user's transactions.
    ///
    /// A failed load after a successful login does not fail the login; it is
    /// reported through [`last_error`](Self::last_error).
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, CoreError> {
        let user = self.session.login(email, password).await?;
        self.sync_store().await;
        Ok(user)
    }

    /// Create an account, log in, and load the (usually empty) transaction list.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        password_confirm: &str,
        username: Option<&str>,
    ) -> Result<User, CoreError> {
        let user = self
            .session
            .register(email, password, password_confirm, username)
            .await?;
        self.sync_store().await;
        Ok(user)
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.store.clear();
    }

    /// Watch the session state (identity, loading, error).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    // ── Transactions ────────────────────────────────────────────────

    pub async fn reload(&mut self) -> Result<(), CoreError> {
        self.store.reload(&mut self.session).await
    }

    pub async fn add_transaction(&mut self, input: TransactionInput) -> Result<(), CoreError> {
        self.store.add(&mut self.session, input).await
    }

    pub async fn delete_transaction(&mut self, id: &str) -> Result<(), CoreError> {
        self.store.remove(&mut self.session, id).await
    }

    #[must_use]
    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        self.store.transactions()
    }

    #[must_use]
    pub fn get_transaction(&self, id: &str) -> Option<&Transaction> {
        self.store.get_by_id(id)
    }

    #[must_use]
    pub fn transactions_by_type(&self, filter: TypeFilter) -> Vec<&Transaction> {
        self.store.by_type(filter)
    }

    /// Transactions by calendar date, newest first unless `ascending`.
    #[must_use]
    pub fn sorted_transactions(&self, ascending: bool) -> Vec<&Transaction> {
        self.store.sorted_by_date(ascending)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.store.last_error()
    }

    // ── Aggregates ──────────────────────────────────────────────────

    #[must_use]
    pub fn balance(&self) -> f64 {
        self.store.balance()
    }

    #[must_use]
    pub fn total_income(&self) -> f64 {
        self.store.total_income()
    }

    #[must_use]
    pub fn total_expenses(&self) -> f64 {
        self.store.total_expenses()
    }

    #[must_use]
    pub fn expenses_by_category(&self) -> Vec<CategoryTotal> {
        self.store.expenses_by_category()
    }

    // ── Internal ────────────────────────────────────────────────────

    /// Bring the list in line with the session: empty without a user, fresh otherwise.
    async fn sync_store(&mut self) {
        if !self.session.is_authenticated() {
            self.store.clear();
            return;
        }
        if let Err(e) = self.store.reload(&mut self.session).await {
            warn!("transactions could not be loaded: {e}");
        }
    }
}
