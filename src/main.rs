mod cli;
mod config;
mod directory;
mod imap;
mod ldap;
mod logging;
mod reconcile;
mod sync;
mod tunnel;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use config::Config;

/// One-way migration of mail domains, user accounts, and mailbox content
/// from one mail platform to another.
#[derive(Parser)]
#[command(version, about)]
pub struct Args {
    /// Sync domain records, optionally restricted to one domain
    #[arg(
        short = 'd',
        long,
        num_args = 0..=1,
        default_missing_value = "*",
        value_name = "DOMAIN"
    )]
    pub domain_sync: Option<String>,

    /// Sync user records, optionally restricted to one mail address
    #[arg(
        short = 'u',
        long,
        num_args = 0..=1,
        default_missing_value = "*",
        value_name = "USER"
    )]
    pub user_sync: Option<String>,

    /// Replicate mailbox content over IMAP
    #[arg(short = 'm', long)]
    pub mail_sync: bool,

    /// Only consider messages received within the last DAYS days
    #[arg(long, value_name = "DAYS")]
    pub min_age: Option<u32>,

    /// Only consider messages sent within the last DAYS days
    #[arg(long, value_name = "DAYS")]
    pub max_age: Option<u32>,

    /// Exit non-zero when any record or user fails to sync
    #[arg(long)]
    pub fail_on_error: bool,

    /// Alternative config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();
    let config = Config::load_from_file(args.config.clone());

    cli::run(&args, &config).await
}
