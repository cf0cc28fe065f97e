mod directory;
mod mail;

use anyhow::{Result, bail};

use crate::Args;
use crate::config::Config;

pub async fn run(args: &Args, config: &Config) -> Result<()> {
    let domain_filter = args.domain_sync.as_deref();
    let user_filter = args.user_sync.as_deref();

    let mut had_errors = false;

    if domain_filter.is_some() || user_filter.is_some() {
        had_errors |= directory::run(config, domain_filter, user_filter).await?;
    }

    if args.mail_sync {
        had_errors |= mail::run(args, config, domain_filter, user_filter).await?;
    }

    if had_errors && (args.fail_on_error || config.sync().fail_on_user_error()) {
        bail!("sync finished with errors");
    }
    Ok(())
}
