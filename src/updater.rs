//! AWS MFA session updater
//!
//! Drives one rotation run over the shared config and credentials files:
//!
//! 1. Back up both files to `<file>.bkp`
//! 2. Load both files into [`ProfileFile`] models
//! 3. Select the base profiles to refresh (interactively unless a profile
//!    was named on the command line)
//! 4. Resolve the MFA device of every selected profile
//! 5. Ask for an MFA code per profile and exchange it for a session
//! 6. Add an `mfa-<profile>` entry to both models
//! 7. Write both files back
//!
//! For a base profile `work`, the files end up with:
//!
//! ```ini
//! # config
//! [profile mfa-work]
//! region = ...                    # copied from [profile work]
//!
//! # credentials
//! [mfa-work]
//! aws_access_key_id = ASIA...
//! aws_secret_access_key = ...
//! aws_security_token = ...        # same as aws_session_token
//! aws_session_token = ...
//! ```
//!
//! The backups are never restored automatically. Writes replace each file
//! atomically, so a failure leaves either the old or the new file in place.

use std::collections::BTreeMap;

use anyhow::Result;
use log::info;

use crate::{
    credentials::{IdentityService, SessionService},
    error::RotateError,
    merge, mfa,
    profile_file::{self, FileFlavor, ProfileFile, SharedFiles},
    prompt::Prompt,
    selector, session,
};

/// Refreshes `mfa-` profiles from their base profiles.
///
/// The updater owns the file models for the duration of a run; the services
/// it calls only ever receive profile names and return values.
pub struct MfaTokenUpdater<S> {
    /// Shared config and credentials files (typically under ~/.aws)
    files: SharedFiles,
    /// Requested session lifetime in seconds (900-129600)
    duration: i32,
    /// IAM and STS access, authenticated from `files`
    services: S,
}

impl<S> MfaTokenUpdater<S>
where
    S: IdentityService + SessionService,
{
    /// Creates an updater for one set of shared files.
    ///
    /// # Arguments
    ///
    /// * `files` - Config and credentials files to read, back up and rewrite.
    ///   The services should authenticate against the same files.
    /// * `duration` - Session lifetime requested from STS, in seconds
    /// * `services` - Identity and session services used for every profile
    pub fn new(files: SharedFiles, duration: i32, services: S) -> Self {
        Self {
            files,
            duration,
            services,
        }
    }

    /// Runs the whole rotation.
    ///
    /// # Arguments
    ///
    /// * `profile` - Base profile to refresh without the selection prompt.
    ///   It must be a profile of the credentials file without the `mfa-`
    ///   prefix.
    /// * `prompt` - Where selections and MFA codes are read from
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Both files were rewritten with the new `mfa-` profiles
    /// * `Err(anyhow::Error)` - The run stopped; no file was rewritten
    ///
    /// # Errors
    ///
    /// Fatal conditions come back as a [`RotateError`] inside the returned
    /// error so the caller can pick a user-facing message:
    /// * [`RotateError::UnknownProfile`] / [`RotateError::NoProfiles`]
    /// * [`RotateError::NoMfaDevice`] / [`RotateError::NoCredentials`]
    /// * [`RotateError::InputClosed`] when stdin ends mid-prompt
    ///
    /// Backup, read and write failures are plain IO errors with the path in
    /// their context. A rejected MFA code is not an error; the code is asked
    /// for again.
    pub async fn update_credentials<P: Prompt>(
        &self,
        profile: Option<&str>,
        prompt: &mut P,
    ) -> Result<()> {
        let SharedFiles {
            config: config_path,
            credentials: credentials_path,
        } = &self.files;

        // Backups first: nothing may be read, let alone written, without one
        for path in [config_path, credentials_path] {
            let backup = profile_file::backup(path).await?;
            info!("Backed up {} to {}", path.display(), backup.display());
        }

        let config = ProfileFile::load(config_path, FileFlavor::Config).await?;
        let credentials = ProfileFile::load(credentials_path, FileFlavor::Credentials).await?;

        prompt.tell(&format!(
            "Parse AWS credentials in {}\n",
            credentials_path.display()
        ));
        let selectable = selector::selectable(credentials.names());
        let profiles = match profile {
            Some(name) if selectable.iter().any(|s| s == name) => vec![name.to_string()],
            Some(name) => return Err(RotateError::UnknownProfile(name.to_string()).into()),
            None => selector::select(&selectable, prompt)?,
        };

        // Every device is resolved before the first code is asked for, so a
        // profile without MFA aborts the run before any session is issued
        let mut serials = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            serials.push(mfa::resolve(&self.services, profile).await?);
        }

        let mut issued = BTreeMap::new();
        for (profile, serial) in profiles.iter().zip(&serials) {
            let session =
                session::issue(&self.services, profile, serial, self.duration, prompt).await?;
            issued.insert(profile.clone(), session);
        }

        let (config, credentials) = merge::merge(&config, &credentials, &issued);
        if config.is_empty() || credentials.is_empty() {
            info!("Nothing to write");
            return Ok(());
        }

        config.save(config_path).await?;
        credentials.save(credentials_path).await?;
        info!(
            "Stored sessions for {} in {} and {}",
            profiles.join(", "),
            config_path.display(),
            credentials_path.display()
        );
        prompt.tell(
            "SUCCESS. Credentials were stored to local AWS creds files. Note: new aws config profile start with mfa-",
        );

        Ok(())
    }
}
