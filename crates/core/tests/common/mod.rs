// ═══════════════════════════════════════════════════════════════════
// Shared test helpers — in-memory RecordStore mock and fixtures
// ═══════════════════════════════════════════════════════════════════

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use financiary_core::backend::traits::{NewTransaction, RecordStore};
use financiary_core::errors::CoreError;
use financiary_core::models::transaction::{Transaction, TransactionType};
use financiary_core::models::user::{Credential, NewAccount, User};

pub const FAR_FUTURE_EXP: i64 = 4_102_444_800; // 2100-01-01
pub const PAST_EXP: i64 = 1_000_000_000; // 2001-09-09

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A JWT-shaped token whose claims carry `id` and `exp`. Signature is junk.
pub fn make_token(user_id: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"id":"{user_id}","exp":{exp}}}"#));
    format!("{header}.{claims}.c2lnbmF0dXJl")
}

pub fn user(id: &str, email: &str) -> User {
    User {
        id: id.into(),
        email: email.into(),
        username: None,
        verified: false,
        created: "2025-01-01 00:00:00.000Z".into(),
        updated: "2025-01-01 00:00:00.000Z".into(),
    }
}

/// Build a transaction directly, for the pure aggregation tests.
pub fn tx(
    id: &str,
    transaction_type: TransactionType,
    amount: f64,
    category: Option<&str>,
    date: NaiveDate,
) -> Transaction {
    Transaction {
        id: id.into(),
        transaction_type,
        amount,
        description: format!("{transaction_type} {id}"),
        category: category.map(str::to_string),
        date,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn income(id: &str, amount: f64) -> Transaction {
    tx(id, TransactionType::Income, amount, None, d(2025, 1, 15))
}

pub fn expense(id: &str, amount: f64, category: Option<&str>) -> Transaction {
    tx(id, TransactionType::Expense, amount, category, d(2025, 1, 15))
}

/// Failure the mock should produce on the next matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Network,
    Unauthorized,
    Server,
}

impl Failure {
    fn to_error(self) -> CoreError {
        match self {
            Failure::Network => CoreError::Network("connection refused".into()),
            Failure::Unauthorized => CoreError::Unauthorized("The request requires valid record authorization token.".into()),
            Failure::Server => CoreError::Api {
                status: 500,
                message: "Something went wrong while processing your request.".into(),
            },
        }
    }
}

struct Account {
    password: String,
    user: User,
}

/// In-memory stand-in for the remote record store.
///
/// Enforces owner scoping the way the server's API rules would, and counts
/// every call so tests can assert that nothing was sent.
#[derive(Default)]
pub struct MockRecordStore {
    accounts: Mutex<HashMap<String, Account>>,
    tokens: Mutex<HashMap<String, String>>,
    revoked: Mutex<HashSet<String>>,
    /// (owner id, record), newest creation first
    records: Mutex<Vec<(String, Transaction)>>,
    next_id: AtomicUsize,
    calls: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    fail_list: Mutex<Option<Failure>>,
    fail_create: Mutex<Option<Failure>>,
    fail_refresh: Mutex<Option<Failure>>,
    /// Lifetime in seconds of tokens issued by `authenticate`; far future when unset
    token_ttl: Mutex<Option<i64>>,
}

impl MockRecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an account directly, bypassing the trait.
    pub fn add_account(&self, id: &str, email: &str, password: &str) -> User {
        let user = user(id, email);
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Hand out a token for an existing account, as a previous run would have.
    pub fn issue_token(&self, email: &str, exp: i64) -> Credential {
        let accounts = self.accounts.lock().unwrap();
        let user = accounts[email].user.clone();
        let token = make_token(&user.id, exp);
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), user.id.clone());
        Credential { token, user }
    }

    pub fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    /// Insert a record owned by `owner` without going through the API.
    pub fn seed(
        &self,
        owner: &str,
        transaction_type: TransactionType,
        amount: f64,
        category: Option<&str>,
        date: NaiveDate,
    ) -> String {
        let record = NewTransaction {
            transaction_type,
            amount,
            description: format!("seeded {transaction_type}"),
            category: category.unwrap_or_default().to_string(),
            date,
            user_id: owner.to_string(),
        };
        self.insert(record).id
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn owned_by(&self, owner: &str) -> Vec<Transaction> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Total number of trait calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_list(&self, failure: Failure) {
        *self.fail_list.lock().unwrap() = Some(failure);
    }

    pub fn fail_next_create(&self, failure: Failure) {
        *self.fail_create.lock().unwrap() = Some(failure);
    }

    pub fn fail_next_refresh(&self, failure: Failure) {
        *self.fail_refresh.lock().unwrap() = Some(failure);
    }

    /// Make `authenticate` hand out tokens that expire `secs` seconds after login.
    pub fn issue_short_lived_tokens(&self, secs: i64) {
        *self.token_ttl.lock().unwrap() = Some(secs);
    }

    fn insert(&self, record: NewTransaction) -> Transaction {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created_at =
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(n as i64);
        let transaction = Transaction {
            id: format!("rec{n:012}"),
            transaction_type: record.transaction_type,
            amount: record.amount,
            description: record.description,
            category: Some(record.category).filter(|c| !c.is_empty()),
            date: record.date,
            created_at,
        };
        self.records
            .lock()
            .unwrap()
            .insert(0, (record.user_id, transaction.clone()));
        transaction
    }

    fn owner_of(&self, token: &str) -> Result<String, CoreError> {
        if self.revoked.lock().unwrap().contains(token) {
            return Err(Failure::Unauthorized.to_error());
        }
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| Failure::Unauthorized.to_error())
    }

    fn take(slot: &Mutex<Option<Failure>>) -> Option<Failure> {
        slot.lock().unwrap().take()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    fn name(&self) -> &str {
        "MockRecordStore"
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Credential, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(a) if a.password == password => a.user.clone(),
                _ => {
                    return Err(CoreError::Authentication(
                        "Failed to authenticate.".into(),
                    ))
                }
            }
        };
        let exp = match *self.token_ttl.lock().unwrap() {
            Some(secs) => Utc::now().timestamp() + secs,
            None => FAR_FUTURE_EXP,
        };
        let token = make_token(&user.id, exp);
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), user.id.clone());
        Ok(Credential { token, user })
    }

    async fn create_account(&self, account: &NewAccount) -> Result<User, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&account.email) {
            return Err(CoreError::Authentication(
                "Failed to create record. (email: The email is invalid or already in use.)".into(),
            ));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut user = user(&format!("usr{n:012}"), &account.email);
        user.username = account.username.clone();
        accounts.insert(
            account.email.clone(),
            Account {
                password: account.password.clone(),
                user: user.clone(),
            },
        );
        Ok(user)
    }

    async fn refresh(&self, token: &str) -> Result<Credential, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = Self::take(&self.fail_refresh) {
            return Err(failure.to_error());
        }
        let owner = self.owner_of(token)?;
        let user = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.user.id == owner)
            .map(|a| a.user.clone())
            .ok_or_else(|| Failure::Unauthorized.to_error())?;
        let fresh = make_token(&owner, FAR_FUTURE_EXP - 1);
        self.tokens.lock().unwrap().insert(fresh.clone(), owner);
        Ok(Credential { token: fresh, user })
    }

    async fn list_transactions(&self, token: &str) -> Result<Vec<Transaction>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = Self::take(&self.fail_list) {
            return Err(failure.to_error());
        }
        let owner = self.owner_of(token)?;
        Ok(self.owned_by(&owner))
    }

    async fn create_transaction(
        &self,
        token: &str,
        transaction: &NewTransaction,
    ) -> Result<Transaction, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = Self::take(&self.fail_create) {
            return Err(failure.to_error());
        }
        let owner = self.owner_of(token)?;
        if owner != transaction.user_id {
            return Err(CoreError::Api {
                status: 400,
                message: "Failed to create record.".into(),
            });
        }
        Ok(self.insert(transaction.clone()))
    }

    async fn delete_transaction(&self, token: &str, id: &str) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let owner = self.owner_of(token)?;
        let mut records = self.records.lock().unwrap();
        // Records of other users are invisible, exactly like missing ones.
        let idx = records
            .iter()
            .position(|(o, t)| *o == owner && t.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("transaction {id}")))?;
        records.remove(idx);
        Ok(())
    }
}
