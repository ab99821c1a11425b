use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::money::Amount;
use super::transaction::{Transaction, TransactionType};

/// Transaction list predicates. Every field is optional; `None` means no
/// constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,

    /// Category id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,

    /// Inclusive lower calendar bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,

    /// Inclusive upper calendar bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<Amount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<Amount>,
}

impl Filter {
    /// The unfiltered collection.
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category = Some(category_id);
        self
    }

    #[must_use]
    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    #[must_use]
    pub fn since(mut self, from: NaiveDate) -> Self {
        self.date_from = Some(from);
        self
    }

    #[must_use]
    pub fn until(mut self, to: NaiveDate) -> Self {
        self.date_to = Some(to);
        self
    }

    #[must_use]
    pub fn amount_range(mut self, min: Option<Amount>, max: Option<Amount>) -> Self {
        self.amount_min = min;
        self.amount_max = max;
        self
    }

    /// Query parameters for the present fields only, in a fixed order:
    /// `type, category, date_from, date_to, amount_min, amount_max`.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(t) = self.transaction_type {
            pairs.push(("type".to_string(), t.as_str().to_string()));
        }
        if let Some(category) = self.category {
            pairs.push(("category".to_string(), category.to_string()));
        }
        if let Some(from) = self.date_from {
            pairs.push(("date_from".to_string(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.date_to {
            pairs.push(("date_to".to_string(), to.format("%Y-%m-%d").to_string()));
        }
        if let Some(min) = self.amount_min {
            pairs.push(("amount_min".to_string(), min.to_string()));
        }
        if let Some(max) = self.amount_max {
            pairs.push(("amount_max".to_string(), max.to_string()));
        }
        pairs
    }

    /// `true` when the transaction satisfies every present predicate.
    #[must_use]
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if self
            .transaction_type
            .is_some_and(|t| t != transaction.transaction_type)
        {
            return false;
        }
        if let Some(category) = self.category {
            if transaction.category.as_ref().map(|c| c.id) != Some(category) {
                return false;
            }
        }
        let day = transaction.day();
        if self.date_from.is_some_and(|from| day < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| day > to) {
            return false;
        }
        if self.amount_min.is_some_and(|min| transaction.amount < min) {
            return false;
        }
        if self.amount_max.is_some_and(|max| transaction.amount > max) {
            return false;
        }
        true
    }
}

/// The six one-tap filter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickFilter {
    All,
    Income,
    Expenses,
    Today,
    /// Last 7 days, today included.
    ThisWeek,
    /// Calendar month to date.
    ThisMonth,
}

impl QuickFilter {
    /// Canonical order. Also the tie-break order of [`QuickFilter::resolve`].
    pub const ALL: [QuickFilter; 6] = [
        QuickFilter::All,
        QuickFilter::Income,
        QuickFilter::Expenses,
        QuickFilter::Today,
        QuickFilter::ThisWeek,
        QuickFilter::ThisMonth,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            QuickFilter::All => "All",
            QuickFilter::Income => "Income",
            QuickFilter::Expenses => "Expenses",
            QuickFilter::Today => "Today",
            QuickFilter::ThisWeek => "This Week",
            QuickFilter::ThisMonth => "This Month",
        }
    }

    /// The concrete filter this preset stands for on `today`.
    #[must_use]
    pub fn to_filter(&self, today: NaiveDate) -> Filter {
        match self {
            QuickFilter::All => Filter::all(),
            QuickFilter::Income => Filter::all().with_type(TransactionType::Income),
            QuickFilter::Expenses => Filter::all().with_type(TransactionType::Expense),
            QuickFilter::Today => Filter::all().since(today),
            QuickFilter::ThisWeek => {
                Filter::all().since(today.checked_sub_days(Days::new(6)).unwrap_or(today))
            }
            QuickFilter::ThisMonth => Filter::all().since(today.with_day(1).unwrap_or(today)),
        }
    }

    /// Which preset, if any, `filter` is exactly equal to on `today`.
    ///
    /// On the first of a month `Today` and `ThisMonth` share a shape; the
    /// earlier preset in [`QuickFilter::ALL`] wins.
    #[must_use]
    pub fn resolve(filter: &Filter, today: NaiveDate) -> Option<QuickFilter> {
        Self::ALL
            .into_iter()
            .find(|quick| quick.to_filter(today) == *filter)
    }
}

impl std::fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for QuickFilter {
    type Err = crate::errors::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(QuickFilter::All),
            "income" => Ok(QuickFilter::Income),
            "expenses" | "expense" => Ok(QuickFilter::Expenses),
            "today" => Ok(QuickFilter::Today),
            "week" | "this week" | "this-week" => Ok(QuickFilter::ThisWeek),
            "month" | "this month" | "this-month" => Ok(QuickFilter::ThisMonth),
            other => Err(crate::errors::CoreError::ValidationError(format!(
                "unknown quick filter '{other}'"
            ))),
        }
    }
}
