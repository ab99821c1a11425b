use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Amount;
use super::transaction::{Category, Transaction};

/// Sum of amounts per transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTotals {
    pub income: Amount,
    pub expense: Amount,
}

impl TypeTotals {
    /// Income minus expense (may be negative).
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.income - self.expense
    }
}

/// Five-band classification of expense / income for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    /// Ratio ≤ 25 %
    Excellent,
    /// Ratio ≤ 40 %
    Good,
    /// Ratio ≤ 60 %
    Okay,
    /// Ratio ≤ 80 %
    Worried,
    /// Ratio > 80 %, or no income at all
    Dead,
}

impl Mood {
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Excellent => "😎",
            Mood::Good => "😊",
            Mood::Okay => "😐",
            Mood::Worried => "😰",
            Mood::Dead => "💀",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Mood::Excellent => "Excellent",
            Mood::Good => "Good",
            Mood::Okay => "Okay",
            Mood::Worried => "Worried",
            Mood::Dead => "Dead",
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Mood::Excellent => "Amazing financial discipline! You're saving like a pro",
            Mood::Good => "Great job! You're managing your money well",
            Mood::Okay => "Decent spending habits, but room for improvement",
            Mood::Worried => "High spending alert! Consider reducing expenses",
            Mood::Dead => "Overspending danger! Immediate budget review needed",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Same,
}

/// Expense change between a current and a prior period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingChange {
    pub direction: Direction,
    /// `round(|current - prior| / prior * 100)`; 0 without a comparison.
    pub percentage: u64,
    /// `false` when the prior period total is zero.
    pub has_comparison: bool,
}

impl SpendingChange {
    #[must_use]
    pub fn no_comparison() -> Self {
        Self {
            direction: Direction::Same,
            percentage: 0,
            has_comparison: false,
        }
    }
}

/// Transactions of one calendar day, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup<'a> {
    pub day: NaiveDate,
    pub transactions: Vec<&'a Transaction>,
}

impl DayGroup<'_> {
    #[must_use]
    pub fn totals(&self) -> TypeTotals {
        let mut totals = TypeTotals::default();
        for t in &self.transactions {
            if t.is_income() {
                totals.income += t.amount;
            } else {
                totals.expense += t.amount;
            }
        }
        totals
    }
}

/// Expense total for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpending {
    /// `None` collects uncategorised expenses.
    pub category: Option<Category>,
    pub total: Amount,
}

impl CategorySpending {
    #[must_use]
    pub fn name(&self) -> &str {
        self.category.as_ref().map_or("Uncategorized", |c| c.name.as_str())
    }
}

/// Expense total for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrendPoint {
    /// First day of the month.
    pub month: NaiveDate,
    /// Short month name, e.g. `"Mar"`.
    pub label: String,
    pub amount: Amount,
}

/// Month balance relative to month income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceHealth {
    /// No income this month; a ratio would be meaningless.
    NoIncome,
    /// Balance / income × 100, clamped to 0..=100.
    Percent(u8),
}

/// Everything the dashboard shows, derived for one reference day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    /// Month-to-date totals.
    pub month: TypeTotals,
    /// Totals over the whole collection.
    pub overall: TypeTotals,
    /// Month-to-date expenses vs the previous calendar month.
    pub spending_change: SpendingChange,
    /// Consecutive days without an expense, ending at `as_of`.
    pub streak: u32,
    pub mood: Mood,
    pub balance_health: BalanceHealth,
}

impl DashboardSummary {
    #[must_use]
    pub fn month_balance(&self) -> Amount {
        self.month.balance()
    }
}

/// Category breakdown, trend and income/expense split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub category_spending: Vec<CategorySpending>,
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    pub income_vs_expense: TypeTotals,
}
