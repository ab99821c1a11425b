use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::money::Amount;

/// Direction of a transaction. The sign of an amount lives here, never in
/// the amount itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
}

impl TransactionType {
    /// Wire value used in query strings and request bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = crate::errors::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" | "expenses" => Ok(TransactionType::Expense),
            other => Err(crate::errors::CoreError::ValidationError(format!(
                "unknown transaction type '{other}' (expected income or expense)"
            ))),
        }
    }
}

/// Reference data owned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub emoji: String,
    pub color: String,
}

/// A single income or expense record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,

    /// Always non-negative; see `transaction_type` for direction. A signed
    /// amount from the provider fails decoding.
    #[serde(deserialize_with = "super::money::deserialize_non_negative")]
    pub amount: Amount,

    pub transaction_type: TransactionType,

    #[serde(default)]
    pub category: Option<Category>,

    #[serde(default)]
    pub description: Option<String>,

    /// When the money moved. Drives every date-based aggregate.
    pub transaction_date: DateTime<Utc>,

    /// When the record was entered.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Calendar day (UTC) of `transaction_date`.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.transaction_date.date_naive()
    }

    #[must_use]
    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }

    #[must_use]
    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    /// Amount with the display sign applied (expenses negative).
    #[must_use]
    pub fn signed_amount(&self) -> Amount {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Payload for `POST /transactions/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub amount: Amount,
    pub transaction_type: TransactionType,
    pub category_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Omitted when `None`; the provider then stamps the current time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(amount: Amount, transaction_type: TransactionType, category_id: i64) -> Self {
        Self {
            amount,
            transaction_type,
            category_id,
            description: None,
            transaction_date: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn on(mut self, transaction_date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(transaction_date);
        self
    }

    /// Rejects payloads the provider would refuse anyway.
    pub fn validate(&self) -> Result<(), crate::errors::CoreError> {
        if self.amount.is_negative() || self.amount.is_zero() {
            return Err(crate::errors::CoreError::ValidationError(format!(
                "amount must be greater than zero (got {})",
                self.amount
            )));
        }
        Ok(())
    }
}
