//! Guards for actions that need a signed-in reader or an administrator.
//!
//! Both guards look only at the [`SessionState`] the coordinator published,
//! so a profile that has not finished syncing is never treated as an admin.

use thiserror::Error;

use ritwrites_core::{Identity, Profile};

use crate::session::{SessionPhase, SessionState};

/// Why a session may not perform an action.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("sign in to continue")]
    SignedOut,

    #[error("administrator access required")]
    NotAdmin,
}

/// Require any signed-in identity.
///
/// # Errors
///
/// Returns `AccessError::SignedOut` if nobody is signed in.
pub fn require_signed_in(state: &SessionState) -> Result<&Identity, AccessError> {
    state.identity.as_ref().ok_or(AccessError::SignedOut)
}

/// Require a synced administrator profile.
///
/// # Errors
///
/// Returns `AccessError::SignedOut` if nobody is signed in, and
/// `AccessError::NotAdmin` if the profile is missing, still syncing, or not
/// an administrator.
pub fn require_admin(state: &SessionState) -> Result<&Profile, AccessError> {
    match state.phase() {
        SessionPhase::Unauthenticated => Err(AccessError::SignedOut),
        SessionPhase::SyncingProfile => Err(AccessError::NotAdmin),
        SessionPhase::Authenticated(profile) if profile.is_admin => Ok(profile),
        SessionPhase::Authenticated(_) => Err(AccessError::NotAdmin),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use ritwrites_core::ProfileId;

    use super::*;

    fn signed_in(is_admin: Option<bool>) -> SessionState {
        let id = ProfileId::random();
        SessionState {
            identity: Some(Identity::new(id, None)),
            profile: is_admin.map(|is_admin| Profile {
                id,
                full_name: None,
                is_admin,
                created_at: Utc::now(),
            }),
            settings: None,
        }
    }

    #[test]
    fn test_signed_out_is_rejected() {
        let state = SessionState::default();
        assert_eq!(require_signed_in(&state), Err(AccessError::SignedOut));
        assert_eq!(require_admin(&state), Err(AccessError::SignedOut));
    }

    #[test]
    fn test_signed_in_without_profile() {
        let state = signed_in(None);
        assert!(require_signed_in(&state).is_ok());
        assert_eq!(require_admin(&state), Err(AccessError::NotAdmin));
    }

    #[test]
    fn test_reader_is_not_admin() {
        let state = signed_in(Some(false));
        assert_eq!(require_admin(&state), Err(AccessError::NotAdmin));
    }

    #[test]
    fn test_admin_passes() {
        let state = signed_in(Some(true));
        let profile = require_admin(&state).unwrap();
        assert!(profile.is_admin);
    }
}
