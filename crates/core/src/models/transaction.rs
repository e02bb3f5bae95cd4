use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money going out
    Expense,
    /// Money coming in
    Income,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Expense => write!(f, "expense"),
            TransactionType::Income => write!(f, "income"),
        }
    }
}

/// Filter used by listing views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    Expense,
    Income,
    #[default]
    All,
}

impl TypeFilter {
    #[must_use]
    pub fn matches(self, transaction_type: TransactionType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Expense => transaction_type == TransactionType::Expense,
            TypeFilter::Income => transaction_type == TransactionType::Income,
        }
    }
}

impl From<TransactionType> for TypeFilter {
    fn from(t: TransactionType) -> Self {
        match t {
            TransactionType::Expense => TypeFilter::Expense,
            TransactionType::Income => TypeFilter::Income,
        }
    }
}

/// A recorded income or expense, as last fetched from the remote store.
///
/// Transactions are never edited locally. The whole list is replaced on
/// every reload, so a `Transaction` is effectively a snapshot of a server record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier assigned by the remote store
    pub id: String,

    /// Expense or Income
    pub transaction_type: TransactionType,

    /// Always positive; the sign comes from `transaction_type`
    pub amount: f64,

    /// Free-text label
    pub description: String,

    /// Optional label, usually one of [`categories_for`](super::category::categories_for)
    pub category: Option<String>,

    /// Calendar date of the transaction (no time component)
    pub date: NaiveDate,

    /// Server-assigned creation instant, used for the default ordering
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[must_use]
    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    #[must_use]
    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }
}

/// User-entered data for a new transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
}

impl TransactionInput {
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            transaction_type,
            amount,
            description: description.into(),
            category: None,
            date,
        }
    }

    pub fn expense(amount: f64, description: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(TransactionType::Expense, amount, description, date)
    }

    pub fn income(amount: f64, description: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(TransactionType::Income, amount, description, date)
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check the input against the entry rules and return the normalized
    /// `(description, category)` pair to send.
    ///
    /// `today` is the local calendar date at entry time.
    pub fn validate(&self, today: NaiveDate) -> Result<(String, Option<String>), CoreError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err(CoreError::Validation("description is required".into()));
        }

        if self.date > today {
            return Err(CoreError::Validation(format!(
                "date {} is in the future",
                self.date
            )));
        }

        // Labels outside the offered vocabulary are kept as typed.
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok((description.to_string(), category))
    }
}

/// Today's date on the local clock.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| CoreError::Validation(format!("invalid date '{s}': {e}")))
}
