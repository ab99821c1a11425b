use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use finance_tracker_core::models::{
    filter::QuickFilter, money::Amount, transaction::TransactionType,
};

#[derive(Debug, Parser)]
#[command(name = "finance-tracker")]
#[command(about = "Track income and expenses against a finance tracker server")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the server base URL (e.g. http://127.0.0.1:8000/api).
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Override where credentials are stored.
    #[arg(long, global = true)]
    pub credentials: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in (password from FINANCE_TRACKER_PASSWORD or stdin).
    Signin {
        #[arg(long)]
        username: String,
    },
    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session.
    Signout,
    /// Show the signed-in user.
    Whoami,
    /// List transactions, grouped by day.
    List(ListArgs),
    /// List categories.
    Categories,
    /// Record a transaction.
    Add(AddArgs),
    /// Month totals, spending change, streak and mood.
    Dashboard {
        /// Reference day (defaults to today, UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Spending per category, monthly trend and income vs expense.
    Analytics {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Preset: all, income, expenses, today, week, month.
    #[arg(long, conflicts_with_all = ["transaction_type", "category", "from", "to", "min", "max"])]
    pub quick: Option<QuickFilter>,
    #[arg(long = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Category id.
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub min: Option<Amount>,
    #[arg(long)]
    pub max: Option<Amount>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long = "type")]
    pub transaction_type: TransactionType,
    #[arg(long)]
    pub amount: Amount,
    /// Category id (see `categories`).
    #[arg(long)]
    pub category: i64,
    #[arg(long)]
    pub description: Option<String>,
    /// Day the money moved (defaults to now).
    #[arg(long)]
    pub date: Option<NaiveDate>,
}
