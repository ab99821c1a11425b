use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};

use crate::models::metrics::{
    AnalyticsSummary, BalanceHealth, CategorySpending, DashboardSummary, DayGroup, Direction,
    Mood, MonthlyTrendPoint, SpendingChange, TypeTotals,
};
use crate::models::money::Amount;
use crate::models::transaction::Transaction;

/// Months covered by the analytics trend unless asked otherwise.
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Derives display aggregates from a transaction collection.
///
/// Pure and synchronous: every method is a function of its arguments, with
/// the reference day passed in rather than read from the clock. Amounts are
/// summed as integer cents, so no drift builds up over large collections.
pub struct MetricsService;

impl MetricsService {
    pub fn new() -> Self {
        Self
    }

    // ── Totals ──────────────────────────────────────────────────────

    /// Sum of amounts per type over the whole input.
    pub fn type_totals(&self, transactions: &[Transaction]) -> TypeTotals {
        totals_of(transactions.iter())
    }

    /// Totals for transactions dated within `from..=to`.
    pub fn period_totals(
        &self,
        transactions: &[Transaction],
        from: NaiveDate,
        to: NaiveDate,
    ) -> TypeTotals {
        totals_of(
            transactions
                .iter()
                .filter(|t| (from..=to).contains(&t.day())),
        )
    }

    /// Totals for the calendar month containing `reference`.
    pub fn month_totals(&self, transactions: &[Transaction], reference: NaiveDate) -> TypeTotals {
        self.period_totals(
            transactions,
            first_of_month(reference),
            last_of_month(reference),
        )
    }

    // ── Comparison ──────────────────────────────────────────────────

    /// Expense change from `prior` to `current`.
    ///
    /// The percentage is `round(|current - prior| / prior * 100)`, half away
    /// from zero. A zero prior has nothing to compare against.
    pub fn spending_change(&self, current: Amount, prior: Amount) -> SpendingChange {
        if prior.cents() <= 0 {
            return SpendingChange::no_comparison();
        }

        let delta = i128::from(current.cents()) - i128::from(prior.cents());
        let prior = i128::from(prior.cents());
        let percentage = (delta.abs() * 200 + prior) / (2 * prior);

        SpendingChange {
            direction: match delta.signum() {
                1 => Direction::Up,
                -1 => Direction::Down,
                _ => Direction::Same,
            },
            percentage: u64::try_from(percentage).unwrap_or(u64::MAX),
            has_comparison: true,
        }
    }

    /// This month's expenses against the whole previous calendar month.
    pub fn month_over_month(
        &self,
        transactions: &[Transaction],
        reference: NaiveDate,
    ) -> SpendingChange {
        let current = self.month_totals(transactions, reference).expense;
        let prior = match first_of_month(reference).checked_sub_months(Months::new(1)) {
            Some(previous) => self.month_totals(transactions, previous).expense,
            None => Amount::ZERO,
        };
        self.spending_change(current, prior)
    }

    // ── Mood ────────────────────────────────────────────────────────

    /// Band for `expense / income × 100`. No income is always `Dead`.
    pub fn classify_mood(&self, expense: Amount, income: Amount) -> Mood {
        let income = i128::from(income.cents());
        if income <= 0 {
            return Mood::Dead;
        }

        // expense * 100 <= band * income, kept in integers
        let scaled = i128::from(expense.cents()) * 100;
        if scaled <= 25 * income {
            Mood::Excellent
        } else if scaled <= 40 * income {
            Mood::Good
        } else if scaled <= 60 * income {
            Mood::Okay
        } else if scaled <= 80 * income {
            Mood::Worried
        } else {
            Mood::Dead
        }
    }

    /// Mood of the calendar month containing `reference`.
    pub fn month_mood(&self, transactions: &[Transaction], reference: NaiveDate) -> Mood {
        let month = self.month_totals(transactions, reference);
        self.classify_mood(month.expense, month.income)
    }

    // ── Presentation helpers ────────────────────────────────────────

    /// Buckets per calendar day, newest day first.
    ///
    /// The input is stably sorted by `transaction_date` descending before
    /// bucketing, so equal timestamps keep their input order. Every input
    /// transaction lands in exactly one bucket.
    pub fn group_by_day<'a>(&self, transactions: &'a [Transaction]) -> Vec<DayGroup<'a>> {
        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        sorted.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));

        let mut groups: Vec<DayGroup<'a>> = Vec::new();
        for t in sorted {
            match groups.last_mut() {
                Some(group) if group.day == t.day() => group.transactions.push(t),
                _ => groups.push(DayGroup {
                    day: t.day(),
                    transactions: vec![t],
                }),
            }
        }
        groups
    }

    /// Consecutive days without an expense, counting back from `reference`.
    ///
    /// Days before the earliest transaction carry no information and end the
    /// streak; an empty collection has no streak.
    pub fn no_spend_streak(&self, transactions: &[Transaction], reference: NaiveDate) -> u32 {
        let Some(earliest) = transactions.iter().map(Transaction::day).min() else {
            return 0;
        };
        let spent: HashSet<NaiveDate> = transactions
            .iter()
            .filter(|t| t.is_expense())
            .map(Transaction::day)
            .collect();

        let mut streak = 0;
        let mut day = reference;
        while day >= earliest && !spent.contains(&day) {
            streak += 1;
            match day.pred_opt() {
                Some(previous) => day = previous,
                None => break,
            }
        }
        streak
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Expense totals per category, largest first, ties by name.
    /// Uncategorised expenses share one bucket.
    pub fn category_spending(&self, transactions: &[Transaction]) -> Vec<CategorySpending> {
        let mut buckets: HashMap<Option<i64>, CategorySpending> = HashMap::new();
        for t in transactions.iter().filter(|t| t.is_expense()) {
            let key = t.category.as_ref().map(|c| c.id);
            buckets
                .entry(key)
                .or_insert_with(|| CategorySpending {
                    category: t.category.clone(),
                    total: Amount::ZERO,
                })
                .total += t.amount;
        }

        let mut spending: Vec<CategorySpending> = buckets.into_values().collect();
        spending.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name().cmp(b.name())));
        spending
    }

    /// Expense totals for the `months` calendar months ending with the
    /// month of `reference`, oldest first.
    pub fn monthly_trend(
        &self,
        transactions: &[Transaction],
        reference: NaiveDate,
        months: u32,
    ) -> Vec<MonthlyTrendPoint> {
        let current = first_of_month(reference);
        (0..months)
            .rev()
            .filter_map(|back| current.checked_sub_months(Months::new(back)))
            .map(|month| MonthlyTrendPoint {
                month,
                label: month.format("%b").to_string(),
                amount: self.month_totals(transactions, month).expense,
            })
            .collect()
    }

    /// Month balance as a share of month income.
    pub fn balance_health(&self, month: &TypeTotals) -> BalanceHealth {
        let income = i128::from(month.income.cents());
        if income <= 0 {
            return BalanceHealth::NoIncome;
        }
        let balance = i128::from(month.balance().cents());
        if balance <= 0 {
            return BalanceHealth::Percent(0);
        }
        let percent = ((balance * 200 + income) / (2 * income)).min(100);
        BalanceHealth::Percent(u8::try_from(percent).unwrap_or(100))
    }

    // ── Summaries ───────────────────────────────────────────────────

    /// Everything the dashboard shows for `reference`.
    pub fn dashboard(&self, transactions: &[Transaction], reference: NaiveDate) -> DashboardSummary {
        let month = self.month_totals(transactions, reference);
        DashboardSummary {
            as_of: reference,
            month,
            overall: self.type_totals(transactions),
            spending_change: self.month_over_month(transactions, reference),
            streak: self.no_spend_streak(transactions, reference),
            mood: self.classify_mood(month.expense, month.income),
            balance_health: self.balance_health(&month),
        }
    }

    /// Category breakdown, six-month trend and overall split.
    pub fn analytics(&self, transactions: &[Transaction], reference: NaiveDate) -> AnalyticsSummary {
        AnalyticsSummary {
            category_spending: self.category_spending(transactions),
            monthly_trend: self.monthly_trend(transactions, reference, DEFAULT_TREND_MONTHS),
            income_vs_expense: self.type_totals(transactions),
        }
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}

fn totals_of<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> TypeTotals {
    let mut totals = TypeTotals::default();
    for t in transactions {
        if t.is_income() {
            totals.income += t.amount;
        } else {
            totals.expense += t.amount;
        }
    }
    totals
}

/// First day of the month containing `day`.
pub fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Last day of the month containing `day`.
pub fn last_of_month(day: NaiveDate) -> NaiveDate {
    first_of_month(day)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
