use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aggregation;
use super::session_manager::SessionManager;
use crate::backend::traits::{NewTransaction, RecordStore};
use crate::errors::CoreError;
use crate::models::category::CategoryTotal;
use crate::models::transaction::{self, Transaction, TransactionInput, TypeFilter};

/// Holds the current user's transactions as last fetched from the backend.
///
/// Writes never patch the list locally: every successful create/delete is
/// followed by a full reload, so the list always mirrors the server. The
/// list is only ever replaced as a whole, and only by a successful reload
/// (or cleared when the session goes away).
///
/// Mutating operations take `&mut self` and await their own reload, so two
/// reloads can never be in flight at once.
pub struct TransactionStore {
    backend: Arc<dyn RecordStore>,
    transactions: Vec<Transaction>,
    last_error: Option<String>,
}

impl std::fmt::Debug for TransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStore")
            .field("backend", &self.backend.name())
            .field("transactions", &self.transactions.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl TransactionStore {
    pub fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self {
            backend,
            transactions: Vec::new(),
            last_error: None,
        }
    }

    // ── Synchronization ─────────────────────────────────────────────

    /// Replace the list with the server's current one.
    ///
    /// Without a valid session the list is emptied and nothing is fetched.
    /// A token refused by the backend expires the session silently. Any other
    /// failure keeps the previous list and is returned (and kept in
    /// [`last_error`](Self::last_error)).
    pub async fn reload(&mut self, session: &mut SessionManager) -> Result<(), CoreError> {
        self.last_error = None;

        let Some(token) = session.valid_credential().map(|c| c.token.clone()) else {
            self.clear();
            return Ok(());
        };

        match self.backend.list_transactions(&token).await {
            Ok(transactions) => {
                debug!(count = transactions.len(), "transactions reloaded");
                self.transactions = transactions;
                Ok(())
            }
            Err(CoreError::Unauthorized(msg)) => {
                info!("token refused while listing transactions ({msg})");
                session.expire();
                self.clear();
                Ok(())
            }
            Err(e) => {
                warn!("failed to reload transactions: {e}");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Record a new transaction for the logged-in user, then reload.
    ///
    /// Nothing is sent when the session is missing or the input is invalid,
    /// and the list is left untouched when the create call fails, unless the
    /// backend refused the token: then the session is expired and the list emptied.
    pub async fn add(
        &mut self,
        session: &mut SessionManager,
        input: TransactionInput,
    ) -> Result<(), CoreError> {
        self.last_error = None;
        let result = self.add_inner(session, input).await;
        self.remember(result)
    }

    async fn add_inner(
        &mut self,
        session: &mut SessionManager,
        input: TransactionInput,
    ) -> Result<(), CoreError> {
        let was_authenticated = session.is_authenticated();
        let Some((token, owner)) = session
            .valid_credential()
            .map(|c| (c.token.clone(), c.user.id.clone()))
        else {
            self.clear_if_lost(was_authenticated);
            return Err(CoreError::NotAuthenticated("add a transaction".into()));
        };

        let (description, category) = input.validate(transaction::today())?;
        let record = NewTransaction {
            transaction_type: input.transaction_type,
            amount: input.amount,
            description,
            category: category.unwrap_or_default(),
            date: input.date,
            user_id: owner,
        };

        let created = self.backend.create_transaction(&token, &record).await;
        let created = created.map_err(|e| self.on_write_error(session, e))?;
        debug!(id = %created.id, "transaction created");

        self.reload(session).await
    }

    /// Delete a transaction by id, then reload.
    pub async fn remove(&mut self, session: &mut SessionManager, id: &str) -> Result<(), CoreError> {
        self.last_error = None;
        let result = self.remove_inner(session, id).await;
        self.remember(result)
    }

    async fn remove_inner(&mut self, session: &mut SessionManager, id: &str) -> Result<(), CoreError> {
        let was_authenticated = session.is_authenticated();
        let Some(token) = session.valid_credential().map(|c| c.token.clone()) else {
            self.clear_if_lost(was_authenticated);
            return Err(CoreError::NotAuthenticated("delete a transaction".into()));
        };

        let deleted = self.backend.delete_transaction(&token, id).await;
        deleted.map_err(|e| self.on_write_error(session, e))?;
        debug!(id, "transaction deleted");

        self.reload(session).await
    }

    /// Drop every transaction (the session is gone).
    pub fn clear(&mut self) {
        if !self.transactions.is_empty() {
            debug!(count = self.transactions.len(), "clearing transactions");
        }
        self.transactions.clear();
    }

    /// The session was present when the operation started and is gone now:
    /// its transactions must not outlive it.
    fn clear_if_lost(&mut self, was_authenticated: bool) {
        if was_authenticated {
            self.clear();
        }
    }

    /// A write refused for its token ends the session like a refused listing
    /// does. The error is still returned to the caller.
    fn on_write_error(&mut self, session: &mut SessionManager, e: CoreError) -> CoreError {
        if let CoreError::Unauthorized(msg) = &e {
            info!("token refused on write ({msg})");
            session.expire();
            self.clear();
        }
        e
    }

    fn remember(&mut self, result: Result<(), CoreError>) -> Result<(), CoreError> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// All transactions, newest creation first.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Message of the last failed operation, cleared when the next one starts.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn by_type(&self, filter: TypeFilter) -> Vec<&Transaction> {
        aggregation::filter_by_type(&self.transactions, filter)
    }

    #[must_use]
    pub fn sorted_by_date(&self, ascending: bool) -> Vec<&Transaction> {
        aggregation::sort_by_date(&self.transactions, ascending)
    }

    // ── Aggregates ──────────────────────────────────────────────────

    #[must_use]
    pub fn balance(&self) -> f64 {
        aggregation::balance(&self.transactions)
    }

    #[must_use]
    pub fn total_income(&self) -> f64 {
        aggregation::total_income(&self.transactions)
    }

    #[must_use]
    pub fn total_expenses(&self) -> f64 {
        aggregation::total_expenses(&self.transactions)
    }

    #[must_use]
    pub fn expenses_by_category(&self) -> Vec<CategoryTotal> {
        aggregation::group_expenses_by_category(&self.transactions)
    }
}
