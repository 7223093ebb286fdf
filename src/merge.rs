//! Folding freshly issued sessions into the config and credentials models.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    credentials::SessionCredentials,
    profile_file::{ProfileFile, ProfileRecord},
    selector::DERIVED_PREFIX,
};

/// Name of the profile holding the session of `profile`.
pub fn derived_name(profile: &str) -> String {
    format!("{DERIVED_PREFIX}{profile}")
}

/// Credentials-file record for a session. `aws_security_token` repeats the
/// session token for SDKs that still read the old key.
pub fn session_record(session: &SessionCredentials) -> ProfileRecord {
    [
        ("aws_access_key_id", &session.access_key_id),
        ("aws_secret_access_key", &session.secret_access_key),
        ("aws_session_token", &session.session_token),
        ("aws_security_token", &session.session_token),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.clone()))
    .collect()
}

/// Returns copies of both models where every profile in `issued` has a
/// companion `mfa-<profile>` entry.
///
/// The config entry copies the base profile's settings (looked up under the
/// bare name, then under `profile <name>`); a base profile missing from the
/// config gets an empty entry. The credentials entry holds the session.
/// Nothing but the derived entries is touched, so merging the same sessions
/// twice gives the same result as merging once.
pub fn merge(
    config: &ProfileFile,
    credentials: &ProfileFile,
    issued: &BTreeMap<String, SessionCredentials>,
) -> (ProfileFile, ProfileFile) {
    let mut config = config.clone();
    let mut credentials = credentials.clone();

    for (profile, session) in issued {
        let derived = derived_name(profile);

        let settings = config
            .get(profile)
            .or_else(|| config.get(&format!("profile {profile}")))
            .cloned()
            .unwrap_or_else(|| {
                warn!("Profile {profile} has no config section, {derived} gets an empty one");
                ProfileRecord::new()
            });
        config.insert(derived.clone(), settings);
        credentials.insert(derived.clone(), session_record(session));
        debug!("Merged session of {profile} into {derived}");
    }

    (config, credentials)
}
