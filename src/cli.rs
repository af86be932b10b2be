use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::auth::Scope;
use crate::config::DEFAULT_CREDENTIALS_PATH;

#[derive(Debug, Parser)]
#[command(
    name = "gmail-tidy",
    version,
    about = "Analyze, archive and label Gmail messages"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Emit JSON summaries")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Count messages per sender across the mailbox
    Senders(SendersArgs),
    /// Analyze recent message headers and optionally label newsletters
    Analyze(AnalyzeArgs),
    /// Save messages from a date range to a text file
    Archive(ArchiveArgs),
    /// Manage stored OAuth tokens
    Auth(AuthArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CredentialArgs {
    #[arg(
        long,
        default_value = DEFAULT_CREDENTIALS_PATH,
        help = "Path to the OAuth client secret JSON, or an op:// secret reference"
    )]
    pub creds: String,
}

#[derive(Debug, Args)]
pub struct SendersArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
    #[arg(long, default_value = "sender_counts.csv", help = "CSV report path")]
    pub output: PathBuf,
    #[arg(long, help = "Only scan the N most recent messages (0 or omitted: all)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
    #[arg(long, default_value = "500", help = "Number of recent messages to analyze")]
    pub max_results: NonZeroUsize,
    #[arg(long, default_value = "email_analysis.csv", help = "CSV report path")]
    pub output: PathBuf,
    #[arg(
        long,
        value_name = "PARENT_LABEL",
        num_args = 0..=1,
        default_missing_value = "unsubscribe",
        help = "Label messages with unsubscribe links as PARENT_LABEL/<domain>"
    )]
    pub label_unsubscribe: Option<String>,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
    #[arg(long, value_parser = parse_date, help = "First day to include (YYYY-MM-DD)")]
    pub start_date: NaiveDate,
    #[arg(long, value_parser = parse_date, help = "Day to stop before (YYYY-MM-DD)")]
    pub end_date: NaiveDate,
    #[arg(long, default_value = "email_archive.txt", help = "Archive file path")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login(AuthLoginArgs),
    Status(AuthScopeArgs),
    Logout(AuthScopeArgs),
}

#[derive(Debug, Args)]
pub struct AuthScopeArgs {
    #[arg(long, value_enum, default_value_t = Scope::ReadOnly, help = "Token scope")]
    pub scope: Scope,
}

#[derive(Debug, Args)]
pub struct AuthLoginArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
    #[command(flatten)]
    pub scope: AuthScopeArgs,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("not a valid date: '{raw}'. use YYYY-MM-DD format"))
}
