//! Collecting MFA codes and exchanging them for session credentials.

use log::{error, info};

use crate::{
    credentials::{SessionCredentials, SessionService},
    error::RotateError,
    prompt::Prompt,
};

/// Session lifetime requested from STS: 12 hours.
pub const DEFAULT_DURATION_SECONDS: i32 = 43_200;

/// An MFA code is exactly six ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Asks for MFA codes until STS accepts one.
///
/// Malformed codes are rejected locally without calling STS. A code STS
/// refuses (wrong or expired) is logged and asked for again; only closed
/// input or a terminal read error ends the loop without a session.
pub async fn issue<S, P>(
    service: &S,
    profile: &str,
    serial_number: &str,
    duration_seconds: i32,
    prompt: &mut P,
) -> Result<SessionCredentials, RotateError>
where
    S: SessionService + ?Sized,
    P: Prompt,
{
    prompt.tell(&format!("\nYou have selected AWS profile: {profile}"));

    loop {
        let code = prompt
            .ask("Provide token-code from your MFA device: ")?
            .ok_or(RotateError::InputClosed("an MFA code"))?;
        let code = code.trim();

        if !is_valid_code(code) {
            prompt.tell("Please provide 6 integers from your Virtual MFA device");
            continue;
        }

        match service
            .get_session_token(profile, duration_seconds, serial_number, code)
            .await
        {
            Ok(session) => {
                info!(
                    "Session token issued for profile {profile}, expires at {}",
                    session.expiration.as_deref().unwrap_or("unknown")
                );
                prompt.tell(&format!(
                    "Session token has been successfully generated for [profile: {profile}]"
                ));
                return Ok(session);
            }
            Err(e) => {
                error!("GetSessionToken for profile {profile} failed: {e:?}");
                prompt.tell(
                    "Access denied! Seems you provided wrong Token code or its expired. Try again...",
                );
            }
        }
    }
}
