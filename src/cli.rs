//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::session::DEFAULT_DURATION_SECONDS;

/// AWS MFA session rotator.
///
/// Exchanges long-term credentials plus an MFA code for a temporary session
/// and stores it as an `mfa-<profile>` profile next to the original one.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Profile to refresh without the selection prompt
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Automation mode; combined with --profile the run does nothing yet
    #[arg(short, long)]
    pub silent: bool,

    /// Path to AWS config file [default: ~/.aws/config]
    #[arg(long, env = "AWS_CONFIG_FILE")]
    pub config_path: Option<PathBuf>,

    /// Path to AWS credentials file [default: ~/.aws/credentials]
    #[arg(short, long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_path: Option<PathBuf>,

    /// Session duration in seconds (900-129600)
    #[arg(
        short,
        long,
        env = "AWS_SESSION_DURATION",
        default_value_t = DEFAULT_DURATION_SECONDS,
        value_parser = clap::value_parser!(i32).range(900..=129_600)
    )]
    pub duration: i32,

    /// Log file [default: ~/.aws/mfa-token.log]
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Both `--silent` and `--profile` were given.
    pub fn is_automation(&self) -> bool {
        self.silent && self.profile.is_some()
    }
}
