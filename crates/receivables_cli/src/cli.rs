//! Command-line surface.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use receivables_core::{Amount, CustomerId, TitleId};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "receivables", version)]
#[command(about = "Track customers, receivable titles and what is still owed")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file; overrides the config and RECEIVABLES_DB_PATH.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Evaluation date (YYYY-MM-DD) used for status and reports.
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage customers.
    #[command(subcommand)]
    Customer(CustomerCommand),
    /// Manage receivable titles.
    #[command(subcommand)]
    Title(TitleCommand),
    /// Totals by status, received this month and titles due soon.
    Dashboard,
    /// Export every title as CSV.
    Export {
        /// Destination file; stdout when absent.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    Add(CustomerAddArgs),
    List {
        /// Case-insensitive match on name, document or email.
        #[arg(long)]
        search: Option<String>,
    },
    /// Customer details with balance.
    Show { id: CustomerId },
    Edit {
        id: CustomerId,
        #[command(flatten)]
        fields: CustomerEditArgs,
    },
    /// Refused while the customer still has titles.
    Delete { id: CustomerId },
}

#[derive(Debug, Args)]
pub struct CustomerAddArgs {
    #[arg(long)]
    pub name: String,
    #[command(flatten)]
    pub contact: ContactArgs,
}

/// Only given flags change; pass an empty value to clear an optional field.
#[derive(Debug, Args)]
pub struct CustomerEditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[command(flatten)]
    pub contact: ContactArgs,
}

#[derive(Debug, Default, Args)]
pub struct ContactArgs {
    #[arg(long)]
    pub document: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TitleCommand {
    Add(TitleAddArgs),
    List {
        #[arg(long)]
        customer: Option<CustomerId>,
    },
    Show {
        id: TitleId,
    },
    /// Change an unpaid title; only given flags change.
    Edit {
        id: TitleId,
        #[command(flatten)]
        fields: TitleEditArgs,
    },
    /// Record payment; defaults to the evaluation date.
    Pay {
        id: TitleId,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: TitleId,
    },
}

#[derive(Debug, Args)]
pub struct TitleAddArgs {
    #[arg(long)]
    pub customer: CustomerId,
    /// Decimal amount, e.g. 1500.00
    #[arg(long)]
    pub amount: Amount,
    /// Defaults to the evaluation date.
    #[arg(long)]
    pub issue: Option<NaiveDate>,
    #[arg(long)]
    pub due: NaiveDate,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub notes: Option<String>,
    /// Split the amount into this many monthly titles, the first due on `--due`.
    #[arg(long)]
    pub installments: Option<u32>,
}

#[derive(Debug, Args)]
pub struct TitleEditArgs {
    #[arg(long)]
    pub amount: Option<Amount>,
    #[arg(long)]
    pub issue: Option<NaiveDate>,
    #[arg(long)]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}
