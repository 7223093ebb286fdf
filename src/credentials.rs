//! Temporary session credentials and the AWS services that produce them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{
    BehaviorVersion, Region, SdkConfig,
    profile::profile_file::{ProfileFileKind, ProfileFiles},
};
use aws_credential_types::provider::ProvideCredentials;
use aws_smithy_types::date_time::Format;
use log::{debug, error, info};

use crate::{error::ServiceError, profile_file::SharedFiles};

/// Region used when the profile does not configure one. IAM and STS both
/// answer from the global endpoint there.
const FALLBACK_REGION: &str = "us-east-1";

/// A temporary STS session issued for one base profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Lifetime that was requested for the session.
    pub duration_seconds: i32,
    /// Expiry reported by STS, RFC 3339.
    pub expiration: Option<String>,
}

/// Looks up the IAM user behind a profile and its MFA devices.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Name of the IAM user the profile's credentials belong to.
    async fn current_user(&self, profile: &str) -> Result<String, ServiceError>;

    /// Serial numbers (ARNs) of the user's MFA devices, in the order IAM
    /// lists them.
    async fn list_mfa_devices(&self, profile: &str, user_name: &str)
    -> Result<Vec<String>, ServiceError>;
}

/// Exchanges long-term credentials plus an MFA code for a session.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn get_session_token(
        &self,
        profile: &str,
        duration_seconds: i32,
        serial_number: &str,
        token_code: &str,
    ) -> Result<SessionCredentials>;
}

/// Both services backed by the AWS SDK.
///
/// Every request is signed with the long-term credentials of the named
/// profile, read from the same config and credentials files the updater
/// loads and rewrites. The SDK's own lookup of `~/.aws/*` and the
/// `AWS_CONFIG_FILE` / `AWS_SHARED_CREDENTIALS_FILE` variables is replaced
/// by these paths, so `--config-path` and `--credentials-path` apply to
/// authentication as well.
///
/// # Example
///
/// ```no_run
/// let files = SharedFiles::resolve(None, None)?;
/// let services = AwsServices::new(files);
/// let user = services.current_user("work").await?;
/// ```
#[derive(Clone, Debug)]
pub struct AwsServices {
    files: SharedFiles,
}

impl AwsServices {
    pub fn new(files: SharedFiles) -> Self {
        Self { files }
    }

    fn profile_files(&self) -> ProfileFiles {
        ProfileFiles::builder()
            .with_file(ProfileFileKind::Config, &self.files.config)
            .with_file(ProfileFileKind::Credentials, &self.files.credentials)
            .build()
    }

    /// Loads the SDK configuration of `profile` from the run's files.
    ///
    /// IAM and STS need a region even though both are global services, so a
    /// profile without one gets [`FALLBACK_REGION`].
    async fn sdk_config(&self, profile: &str) -> SdkConfig {
        let loaded = aws_config::defaults(BehaviorVersion::latest())
            .profile_files(self.profile_files())
            .profile_name(profile)
            .load()
            .await;

        if loaded.region().is_some() {
            return loaded;
        }
        debug!("Profile {profile} has no region, using {FALLBACK_REGION}");
        aws_config::defaults(BehaviorVersion::latest())
            .profile_files(self.profile_files())
            .profile_name(profile)
            .region(Region::new(FALLBACK_REGION))
            .load()
            .await
    }

    /// Loads the profile's config and makes sure its credentials resolve
    /// before any request is signed with them.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoCredentials`] when the provider chain has no
    /// provider or the provider cannot produce credentials for `profile`.
    /// The provider's own error is logged, not returned.
    async fn authenticated_config(&self, profile: &str) -> Result<SdkConfig, ServiceError> {
        let config = self.sdk_config(profile).await;
        let provider = config
            .credentials_provider()
            .ok_or_else(|| ServiceError::NoCredentials(profile.to_string()))?;

        // Resolve once up front: a missing profile would otherwise surface as
        // an opaque dispatch failure of the first IAM call.
        if let Err(e) = provider.provide_credentials().await {
            error!("Credentials for profile {profile} could not be resolved: {e:?}");
            return Err(ServiceError::NoCredentials(profile.to_string()));
        }
        Ok(config)
    }
}

#[async_trait]
impl IdentityService for AwsServices {
    async fn current_user(&self, profile: &str) -> Result<String, ServiceError> {
        let config = self.authenticated_config(profile).await?;
        let output = aws_sdk_iam::Client::new(&config)
            .get_user()
            .send()
            .await
            .context("IAM GetUser request failed")?;

        let user_name = output
            .user()
            .map(|user| user.user_name().to_string())
            .context("IAM GetUser returned no user")?;
        debug!("Profile {profile} belongs to IAM user {user_name}");
        Ok(user_name)
    }

    async fn list_mfa_devices(
        &self,
        profile: &str,
        user_name: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let config = self.authenticated_config(profile).await?;
        let output = aws_sdk_iam::Client::new(&config)
            .list_mfa_devices()
            .user_name(user_name)
            .send()
            .await
            .context("IAM ListMFADevices request failed")?;

        Ok(output
            .mfa_devices()
            .iter()
            .map(|device| device.serial_number().to_string())
            .collect())
    }
}

#[async_trait]
impl SessionService for AwsServices {
    async fn get_session_token(
        &self,
        profile: &str,
        duration_seconds: i32,
        serial_number: &str,
        token_code: &str,
    ) -> Result<SessionCredentials> {
        info!("Fetching session token for profile {profile} - Duration: {duration_seconds}s");
        let config = self.sdk_config(profile).await;

        let credentials = aws_sdk_sts::Client::new(&config)
            .get_session_token()
            .duration_seconds(duration_seconds)
            .serial_number(serial_number)
            .token_code(token_code)
            .send()
            .await?
            .credentials()
            .cloned()
            .context("No credentials returned")?;

        Ok(SessionCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            duration_seconds,
            expiration: credentials.expiration().fmt(Format::DateTime).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn services_for(config: &str, credentials: &str) -> (tempfile::TempDir, AwsServices) {
        let dir = tempfile::tempdir().unwrap();
        let files = SharedFiles {
            config: dir.path().join("config"),
            credentials: dir.path().join("credentials"),
        };
        fs::write(&files.config, config).unwrap();
        fs::write(&files.credentials, credentials).unwrap();
        (dir, AwsServices::new(files))
    }

    #[tokio::test]
    async fn test_credentials_come_from_the_given_files() {
        let (_dir, services) = services_for(
            "[profile only-here]\nregion = eu-west-1\n",
            "[only-here]\naws_access_key_id = AKIAONLYHERE\naws_secret_access_key = secret\n",
        );

        let config = services
            .authenticated_config("only-here")
            .await
            .expect("profile from the given credentials file should resolve");

        assert!(config.region().is_some());
        // Environment credentials take precedence over any profile
        if std::env::var_os("AWS_ACCESS_KEY_ID").is_none() {
            let credentials = config
                .credentials_provider()
                .unwrap()
                .provide_credentials()
                .await
                .unwrap();
            assert_eq!(credentials.access_key_id(), "AKIAONLYHERE");
        }
    }

    #[tokio::test]
    async fn test_region_from_the_given_config_file() {
        let (_dir, services) = services_for(
            "[profile only-here]\nregion = ap-southeast-2\n",
            "[only-here]\naws_access_key_id = AKIAONLYHERE\naws_secret_access_key = secret\n",
        );

        let config = services.sdk_config("only-here").await;

        if std::env::var_os("AWS_REGION").is_none()
            && std::env::var_os("AWS_DEFAULT_REGION").is_none()
        {
            assert_eq!(
                config.region().map(|r| r.as_ref().to_string()),
                Some("ap-southeast-2".to_string())
            );
        }
    }
}
