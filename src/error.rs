//! Failures that end a run, plus the error type of the identity service.

/// Errors reported by an [`IdentityService`](crate::credentials::IdentityService).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The profile's credentials provider could not produce credentials.
    #[error("No usable credentials for profile {0}")]
    NoCredentials(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Conditions that abort the whole run.
///
/// A rejected MFA code is not one of them; the session issuer asks again.
#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    #[error(
        "Your account has no virtual MFA device (profile: {0}). Create a virtual device or use another account."
    )]
    NoMfaDevice(String),

    #[error("Can't find your credentials for profile {0}. Please check credentials config file.")]
    NoCredentials(String),

    #[error("Failed to look up the IAM user of profile {profile}")]
    Identity {
        profile: String,
        #[source]
        source: ServiceError,
    },

    #[error("No profiles without the mfa- prefix found in the credentials file")]
    NoProfiles,

    #[error("Profile {0} is not a selectable profile in the credentials file")]
    UnknownProfile(String),

    #[error("Input closed while waiting for {0}")]
    InputClosed(&'static str),

    #[error("Failed to read from the terminal")]
    Io(#[from] std::io::Error),
}
