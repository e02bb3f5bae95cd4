use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::{NewTransaction, RecordStore};
use crate::errors::CoreError;
use crate::models::settings::RemoteSettings;
use crate::models::transaction::{Transaction, TransactionType};
use crate::models::user::{Credential, NewAccount, User};

const NAME: &str = "PocketBase";

/// Record store backed by a PocketBase server.
///
/// - **Auth**: password auth against an auth collection, token refresh.
/// - **Records**: one base collection of transactions; the server's API rules
///   restrict list/create/delete to the token's owner.
/// - **Endpoints**: `/api/collections/{collection}/auth-with-password`,
///   `/auth-refresh`, `/records`, `/records/{id}`
pub struct PocketBaseStore {
    client: Client,
    base_url: Url,
    users_collection: String,
    transactions_collection: String,
    max_retries: u32,
    page_size: u32,
}

impl std::fmt::Debug for PocketBaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PocketBaseStore")
            .field("base_url", &self.base_url.as_str())
            .field("users_collection", &self.users_collection)
            .field("transactions_collection", &self.transactions_collection)
            .finish_non_exhaustive()
    }
}

impl PocketBaseStore {
    pub fn new(settings: &RemoteSettings) -> Result<Self, CoreError> {
        let base_url = settings.base_url()?;
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
        let client = builder
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            users_collection: settings.users_collection.clone(),
            transactions_collection: settings.transactions_collection.clone(),
            max_retries: settings.max_retries,
            page_size: settings.page_size.max(1),
        })
    }

    fn collection_url(&self, collection: &str, action: &str) -> Result<Url, CoreError> {
        self.base_url
            .join(&format!("api/collections/{collection}/{action}"))
            .map_err(|e| CoreError::Config(format!("invalid collection URL: {e}")))
    }

    fn record_url(&self, id: &str) -> Result<Url, CoreError> {
        let mut url = self.collection_url(&self.transactions_collection, "records")?;
        url.path_segments_mut()
            .map_err(|_| CoreError::Config("base_url cannot carry a path".into()))?
            .push(id);
        Ok(url)
    }

    /// Send a request and turn non-2xx answers into a [`CoreError`].
    async fn execute(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
        subject: &str,
    ) -> Result<reqwest::Response, CoreError> {
        let res = request.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        Err(error_from_response(status.as_u16(), &body, endpoint, subject))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
        subject: &str,
    ) -> Result<T, CoreError> {
        let res = self.execute(request, endpoint, subject).await?;
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Run an idempotent request, retrying network-level failures up to `max_retries` times.
    async fn with_retries<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(CoreError::Network(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, max = self.max_retries, "{what} failed ({msg}), retrying");
                }
                other => return other,
            }
        }
    }
}

// ── PocketBase wire types ───────────────────────────────────────────

#[derive(Serialize)]
struct PasswordAuthRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest<'a> {
    email: &'a str,
    password: &'a str,
    password_confirm: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    record: UserRecord,
}

#[derive(Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            email: r.email,
            username: r.username.filter(|u| !u.trim().is_empty()),
            verified: r.verified,
            created: r.created,
            updated: r.updated,
        }
    }
}

#[derive(Deserialize)]
struct TransactionRecord {
    id: String,
    created: String,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    amount: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    date: String,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = CoreError;

    fn try_from(r: TransactionRecord) -> Result<Self, Self::Error> {
        Ok(Transaction {
            date: parse_record_date(&r.date)?,
            created_at: parse_timestamp(&r.created)?,
            id: r.id,
            transaction_type: r.transaction_type,
            amount: r.amount,
            description: r.description,
            category: r.category.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct ListPage {
    items: Vec<TransactionRecord>,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: BTreeMap<String, FieldError>,
}

#[derive(Deserialize)]
struct FieldError {
    #[serde(default)]
    message: String,
}

/// Which kind of endpoint produced an error response; decides how a 400 is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `auth-with-password`: a 400 means bad credentials.
    Authenticate,
    /// Account creation: a 400 lists the rejected fields.
    CreateAccount,
    /// `auth-refresh` and the record endpoints.
    Records,
}

/// Map a PocketBase error response to a [`CoreError`].
///
/// `subject` names what was being accessed and ends up in `NotFound` messages.
pub fn error_from_response(status: u16, body: &str, endpoint: Endpoint, subject: &str) -> CoreError {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let mut message = if parsed.message.trim().is_empty() {
        "unknown error".to_string()
    } else {
        parsed.message.trim().to_string()
    };
    let details: Vec<String> = parsed
        .data
        .iter()
        .filter(|(_, e)| !e.message.is_empty())
        .map(|(field, e)| format!("{field}: {}", e.message))
        .collect();
    if !details.is_empty() {
        message = format!("{message} ({})", details.join("; "));
    }

    match (status, endpoint) {
        (400, Endpoint::Authenticate | Endpoint::CreateAccount) => CoreError::Authentication(message),
        (401 | 403, _) => CoreError::Unauthorized(message),
        (404, _) => CoreError::NotFound(subject.to_string()),
        _ => CoreError::Api { status, message },
    }
}

/// Parse the `date` field of a record: `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_record_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| CoreError::Deserialization(format!("invalid record date '{raw}': {e}")))
}

/// Parse a PocketBase timestamp (`2024-01-15 10:30:00.123Z`) or an RFC 3339 one.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.fZ") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::Deserialization(format!("invalid timestamp '{raw}': {e}")))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RecordStore for PocketBaseStore {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Credential, CoreError> {
        let url = self.collection_url(&self.users_collection, "auth-with-password")?;
        debug!(email, "authenticating against {NAME}");

        let resp: AuthResponse = self
            .execute_json(
                self.client
                    .post(url)
                    .json(&PasswordAuthRequest { identity: email, password }),
                Endpoint::Authenticate,
                email,
            )
            .await?;

        Ok(Credential {
            token: resp.token,
            user: resp.record.into(),
        })
    }

    async fn create_account(&self, account: &NewAccount) -> Result<User, CoreError> {
        let url = self.collection_url(&self.users_collection, "records")?;
        debug!(email = %account.email, "creating account on {NAME}");

        let record: UserRecord = self
            .execute_json(
                self.client.post(url).json(&CreateAccountRequest {
                    email: &account.email,
                    password: &account.password,
                    password_confirm: &account.password_confirm,
                    username: account.username.as_deref(),
                }),
                Endpoint::CreateAccount,
                &account.email,
            )
            .await?;

        Ok(record.into())
    }

    async fn refresh(&self, token: &str) -> Result<Credential, CoreError> {
        let url = self.collection_url(&self.users_collection, "auth-refresh")?;

        let resp: AuthResponse = self
            .with_retries("token refresh", || {
                self.execute_json(
                    self.client.post(url.clone()).header(AUTHORIZATION, token),
                    Endpoint::Records,
                    "session",
                )
            })
            .await?;

        Ok(Credential {
            token: resp.token,
            user: resp.record.into(),
        })
    }

    async fn list_transactions(&self, token: &str) -> Result<Vec<Transaction>, CoreError> {
        let url = self.collection_url(&self.transactions_collection, "records")?;
        let per_page = self.page_size.to_string();
        let mut transactions = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let resp: ListPage = self
                .with_retries("transaction listing", || {
                    self.execute_json(
                        self.client
                            .get(url.clone())
                            .header(AUTHORIZATION, token)
                            .query(&[
                                ("page", page_param.as_str()),
                                ("perPage", per_page.as_str()),
                                ("sort", "-created"),
                                ("skipTotal", "1"),
                            ]),
                        Endpoint::Records,
                        &self.transactions_collection,
                    )
                })
                .await?;

            let fetched = resp.items.len();
            for record in resp.items {
                transactions.push(Transaction::try_from(record)?);
            }
            if fetched < self.page_size as usize {
                break;
            }
            page += 1;
        }

        debug!(count = transactions.len(), pages = page, "listed transactions");
        Ok(transactions)
    }

    async fn create_transaction(
        &self,
        token: &str,
        transaction: &NewTransaction,
    ) -> Result<Transaction, CoreError> {
        let url = self.collection_url(&self.transactions_collection, "records")?;

        let record: TransactionRecord = self
            .execute_json(
                self.client
                    .post(url)
                    .header(AUTHORIZATION, token)
                    .json(transaction),
                Endpoint::Records,
                &self.transactions_collection,
            )
            .await?;

        Transaction::try_from(record)
    }

    async fn delete_transaction(&self, token: &str, id: &str) -> Result<(), CoreError> {
        let url = self.record_url(id)?;
        self.execute(
            self.client.delete(url).header(AUTHORIZATION, token),
            Endpoint::Records,
            &format!("transaction {id}"),
        )
        .await?;
        Ok(())
    }
}
