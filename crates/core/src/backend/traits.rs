use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::CoreError;
use crate::models::transaction::{Transaction, TransactionType};
use crate::models::user::{Credential, NewAccount, User};

/// A transaction record ready to be created remotely, already validated
/// and tagged with its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: String,
    /// Sent as an empty string when absent
    pub category: String,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(rename = "userId")]
    pub user_id: String,
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }
}

/// The remote record store the core talks to.
///
/// Authentication, persistence and per-owner access rules all live on the
/// other side of this trait. Listing calls only ever return the records of
/// the user the token belongs to.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RecordStore: Send + Sync {
    /// Human-readable name of this backend (for logs).
    fn name(&self) -> &str;

    /// Exchange email and password for a credential.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Credential, CoreError>;

    /// Create a new user account. Does not log in.
    async fn create_account(&self, account: &NewAccount) -> Result<User, CoreError>;

    /// Validate a token and return a fresh credential for it.
    async fn refresh(&self, token: &str) -> Result<Credential, CoreError>;

    /// All transactions of the token's owner, newest creation first.
    async fn list_transactions(&self, token: &str) -> Result<Vec<Transaction>, CoreError>;

    /// Create a transaction and return the stored record.
    async fn create_transaction(
        &self,
        token: &str,
        transaction: &NewTransaction,
    ) -> Result<Transaction, CoreError>;

    /// Delete a transaction. Fails with [`CoreError::NotFound`] for unknown ids.
    async fn delete_transaction(&self, token: &str, id: &str) -> Result<(), CoreError>;
}
