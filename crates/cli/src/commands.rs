use std::io::BufRead;

use chrono::{NaiveDate, NaiveTime, Utc};
use finance_tracker_core::{
    models::{
        filter::{Filter, QuickFilter},
        metrics::{BalanceHealth, Direction},
        transaction::{NewTransaction, Transaction},
    },
    FinanceTracker,
};

use crate::cli::{AddArgs, Command, ListArgs};
use crate::error::{AppError, Result};

const PASSWORD_ENV: &str = "FINANCE_TRACKER_PASSWORD";

pub async fn run(tracker: &FinanceTracker, command: Command) -> Result<()> {
    let today = Utc::now().date_naive();

    match command {
        Command::Signin { username } => {
            let password = read_password()?;
            let user = tracker.sign_in(&username, &password).await?;
            println!("Signed in as {}", user.username);
        }
        Command::Signup { username, email } => {
            let password = read_password()?;
            let user = tracker.sign_up(&username, &email, &password).await?;
            println!("Welcome, {}!", user.username);
        }
        Command::Signout => {
            tracker.sign_out();
            println!("Signed out");
        }
        Command::Whoami => match tracker.current_user() {
            Some(user) if tracker.is_authenticated() => {
                println!("{} <{}>", user.username, user.email);
            }
            _ => println!("Not signed in"),
        },
        Command::List(args) => list(tracker, args, today).await?,
        Command::Categories => {
            require_session(tracker)?;
            for category in tracker.categories().await {
                println!("{:>4}  {} {}", category.id, category.emoji, category.name);
            }
        }
        Command::Add(args) => add(tracker, args).await?,
        Command::Dashboard { date } => {
            require_session(tracker)?;
            let summary = tracker.dashboard(date.unwrap_or(today)).await;

            println!("As of {}", summary.as_of);
            println!("  Month income    {:>12}", summary.month.income);
            println!("  Month spending  {:>12}", summary.month.expense);
            println!("  Month balance   {:>12}", summary.month_balance());
            let change = summary.spending_change;
            if change.has_comparison {
                let arrow = match change.direction {
                    Direction::Up => "▲",
                    Direction::Down => "▼",
                    Direction::Same => "=",
                };
                println!("  vs last month   {arrow} {}%", change.percentage);
            } else {
                println!("  vs last month   no spending last month");
            }
            match summary.balance_health {
                BalanceHealth::NoIncome => println!("  Balance health  no income this month"),
                BalanceHealth::Percent(p) => println!("  Balance health  {p}% of income left"),
            }
            println!("  No-spend streak {} day(s)", summary.streak);
            println!("  Mood            {} - {}", summary.mood, summary.mood.message());
        }
        Command::Analytics { date } => {
            require_session(tracker)?;
            let summary = tracker.analytics(date.unwrap_or(today)).await;

            println!("Spending by category");
            for spending in &summary.category_spending {
                println!("  {:<20} {:>12}", spending.name(), spending.total);
            }
            println!("Monthly spending");
            for point in &summary.monthly_trend {
                println!("  {} {}  {:>12}", point.label, point.month.format("%Y"), point.amount);
            }
            let split = summary.income_vs_expense;
            println!("Income {}  Expenses {}  Balance {}", split.income, split.expense, split.balance());
        }
    }

    Ok(())
}

async fn list(tracker: &FinanceTracker, args: ListArgs, today: NaiveDate) -> Result<()> {
    require_session(tracker)?;

    let filter = match args.quick {
        Some(quick) => quick.to_filter(today),
        None => Filter {
            transaction_type: args.transaction_type,
            category: args.category,
            date_from: args.from,
            date_to: args.to,
            amount_min: args.min,
            amount_max: args.max,
        },
    };
    if let Some(active) = QuickFilter::resolve(&filter, today) {
        println!("[{active}]");
    }

    let transactions = tracker.transactions(&filter).await;
    if transactions.is_empty() {
        println!("No transactions");
        return Ok(());
    }

    for group in tracker.metrics().group_by_day(&transactions) {
        let totals = group.totals();
        println!(
            "{}  +{} / -{}",
            group.day.format("%a %d %b %Y"),
            totals.income,
            totals.expense
        );
        for t in group.transactions {
            print_transaction(t);
        }
    }
    Ok(())
}

async fn add(tracker: &FinanceTracker, args: AddArgs) -> Result<()> {
    require_session(tracker)?;

    let mut new = NewTransaction::new(args.amount, args.transaction_type, args.category);
    if let Some(description) = args.description {
        new = new.with_description(description);
    }
    if let Some(date) = args.date {
        new = new.on(date.and_time(NaiveTime::MIN).and_utc());
    }

    let created = tracker.create_transaction(&new).await?;
    print_transaction(&created);
    Ok(())
}

fn print_transaction(t: &Transaction) {
    let category = t
        .category
        .as_ref()
        .map_or_else(|| "Uncategorized".to_string(), |c| format!("{} {}", c.emoji, c.name));
    println!(
        "  #{:<6} {:>12}  {:<24} {}",
        t.id,
        t.signed_amount(),
        category,
        t.description.as_deref().unwrap_or("")
    );
}

fn require_session(tracker: &FinanceTracker) -> Result<()> {
    if tracker.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::SignedOut)
    }
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            return Ok(password);
        }
    }

    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::Input("password must not be empty".into()));
    }
    Ok(password)
}
