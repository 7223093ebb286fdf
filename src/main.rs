//! AWS MFA session rotator
//!
//! Turns long-lived profiles from the shared AWS credentials file into
//! temporary, MFA-authenticated sessions stored as `mfa-<profile>` profiles.
//!
//! The program performs the following operations:
//! 1. Parses command-line arguments and opens the log file
//! 2. Backs up and loads `~/.aws/config` and `~/.aws/credentials`
//! 3. Lets the user pick the profiles to refresh
//! 4. Looks up each profile's MFA device and asks for a code
//! 5. Exchanges the codes for 12 hour STS sessions
//! 6. Writes the sessions back as `mfa-<profile>` profiles

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

mod cli;
mod credentials;
mod error;
mod logging;
mod merge;
mod mfa;
mod profile_file;
mod prompt;
mod selector;
mod session;
mod updater;

use cli::Args;
use credentials::AwsServices;
use error::RotateError;
use logging::LogContext;
use profile_file::SharedFiles;
use prompt::StdinPrompt;
use updater::MfaTokenUpdater;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_context = match LogContext::init(args.log_file.clone()) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("ERROR. {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run aborted: {e:?}");
            match e.downcast_ref::<RotateError>() {
                Some(fatal) => eprintln!("\nERROR. {fatal}"),
                None => eprintln!("\nERROR. {e:#}"),
            }
            eprintln!("Details were written to {}", log_context.path().display());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    if args.is_automation() {
        // No behaviour is defined for automation runs yet.
        warn!("--silent together with --profile is not implemented, nothing to do");
        return Ok(());
    }

    info!("Starting MFA session rotation - Duration: {}s", args.duration);
    // The SDK must authenticate from the same files that are listed and rewritten
    let files = SharedFiles::resolve(args.config_path, args.credentials_path)?;
    let services = AwsServices::new(files.clone());
    let updater = MfaTokenUpdater::new(files, args.duration, services);
    updater
        .update_credentials(args.profile.as_deref(), &mut StdinPrompt)
        .await
}
