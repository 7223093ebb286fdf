//! Finding the MFA device registered for a profile.

use log::{error, info};

use crate::{
    credentials::IdentityService,
    error::{RotateError, ServiceError},
};

/// Returns the serial number of the MFA device of `profile`'s IAM user.
///
/// The first device wins when several are registered. Having none, or having
/// no usable local credentials, ends the run.
pub async fn resolve<I>(identity: &I, profile: &str) -> Result<String, RotateError>
where
    I: IdentityService + ?Sized,
{
    let devices = match list_devices(identity, profile).await {
        Ok(devices) => devices,
        Err(ServiceError::NoCredentials(_)) => {
            error!("No credentials available for profile {profile}");
            return Err(RotateError::NoCredentials(profile.to_string()));
        }
        Err(source) => {
            error!("MFA device lookup for profile {profile} failed: {source:?}");
            return Err(RotateError::Identity {
                profile: profile.to_string(),
                source,
            });
        }
    };

    let serial = devices.into_iter().next().ok_or_else(|| {
        error!("Profile {profile} has no MFA device");
        RotateError::NoMfaDevice(profile.to_string())
    })?;
    info!("Profile {profile} uses MFA device {serial}");
    Ok(serial)
}

async fn list_devices<I>(identity: &I, profile: &str) -> Result<Vec<String>, ServiceError>
where
    I: IdentityService + ?Sized,
{
    let user_name = identity.current_user(profile).await?;
    identity.list_mfa_devices(profile, &user_name).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct FakeIdentity {
        user: Result<&'static str, &'static str>,
        devices: Vec<&'static str>,
        listed_for: Mutex<Vec<String>>,
    }

    impl FakeIdentity {
        fn with_devices(devices: &[&'static str]) -> Self {
            Self {
                user: Ok("alice"),
                devices: devices.to_vec(),
                listed_for: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IdentityService for FakeIdentity {
        async fn current_user(&self, profile: &str) -> Result<String, ServiceError> {
            match self.user {
                Ok(user) => Ok(user.to_string()),
                Err("no-credentials") => Err(ServiceError::NoCredentials(profile.to_string())),
                Err(other) => Err(anyhow::anyhow!(other).into()),
            }
        }

        async fn list_mfa_devices(
            &self,
            _profile: &str,
            user_name: &str,
        ) -> Result<Vec<String>, ServiceError> {
            self.listed_for.lock().unwrap().push(user_name.to_string());
            Ok(self.devices.iter().map(|d| d.to_string()).collect())
        }
    }

    #[tokio::test]
    async fn test_resolve_returns_first_device() {
        let identity = FakeIdentity::with_devices(&[
            "arn:aws:iam::123456789012:mfa/alice",
            "arn:aws:iam::123456789012:mfa/alice-backup",
        ]);

        let serial = resolve(&identity, "work").await.unwrap();

        assert_eq!(serial, "arn:aws:iam::123456789012:mfa/alice");
        assert_eq!(*identity.listed_for.lock().unwrap(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_without_device() {
        let identity = FakeIdentity::with_devices(&[]);
        let result = resolve(&identity, "work").await;
        assert!(matches!(result, Err(RotateError::NoMfaDevice(p)) if p == "work"));
    }

    #[tokio::test]
    async fn test_resolve_without_credentials() {
        let identity = FakeIdentity {
            user: Err("no-credentials"),
            ..FakeIdentity::with_devices(&["arn"])
        };

        let result = resolve(&identity, "work").await;

        assert!(matches!(result, Err(RotateError::NoCredentials(p)) if p == "work"));
        assert!(identity.listed_for.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_other_failure_is_identity_error() {
        let identity = FakeIdentity {
            user: Err("AccessDenied"),
            ..FakeIdentity::with_devices(&["arn"])
        };

        let result = resolve(&identity, "work").await;

        assert!(matches!(result, Err(RotateError::Identity { ref profile, .. }) if profile == "work"));
    }
}
