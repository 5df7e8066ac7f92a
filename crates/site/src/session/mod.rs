//! Client session state.
//!
//! [`SessionState`] is derived entirely from the identity provider and the
//! profile and settings stores. It is owned and written by the
//! [`SessionProfileCoordinator`]; everything else observes it read-only.

pub mod coordinator;

use serde::Serialize;

use ritwrites_core::{Identity, Profile, SiteSettings};

pub use coordinator::{CoordinatorTask, SessionProfileCoordinator};

/// Snapshot of who is signed in and what the site looks like.
///
/// Absent values are valid, renderable states: `profile == None` while
/// `identity` is set means the sync is in progress or degraded, and
/// `settings == None` means no settings row exists or it could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub settings: Option<SiteSettings>,
}

/// Where the session is in the sign-in lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase<'a> {
    /// Nobody is signed in.
    Unauthenticated,
    /// Signed in, profile not (yet) available.
    SyncingProfile,
    /// Signed in with a resolved profile.
    Authenticated(&'a Profile),
}

impl SessionState {
    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase<'_> {
        match (&self.identity, &self.profile) {
            (None, _) => SessionPhase::Unauthenticated,
            (Some(identity), Some(profile)) if profile.id == identity.id => {
                SessionPhase::Authenticated(profile)
            }
            (Some(_), _) => SessionPhase::SyncingProfile,
        }
    }

    /// Whether the signed-in profile may use the admin area.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.phase(), SessionPhase::Authenticated(profile) if profile.is_admin)
    }

    /// Site title, or `default` when no settings are loaded.
    #[must_use]
    pub fn site_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.settings
            .as_ref()
            .map_or(default, |settings| settings.site_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ritwrites_core::ProfileId;

    use super::*;

    fn profile(id: ProfileId, is_admin: bool) -> Profile {
        Profile {
            id,
            full_name: None,
            is_admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_phase_transitions() {
        let id = ProfileId::random();
        let mut state = SessionState::default();
        assert_eq!(state.phase(), SessionPhase::Unauthenticated);

        state.identity = Some(Identity::new(id, None));
        assert_eq!(state.phase(), SessionPhase::SyncingProfile);

        state.profile = Some(profile(id, false));
        assert!(matches!(state.phase(), SessionPhase::Authenticated(p) if p.id == id));
    }

    #[test]
    fn test_mismatched_profile_is_not_authenticated() {
        let mut state = SessionState {
            identity: Some(Identity::new(ProfileId::random(), None)),
            profile: Some(profile(ProfileId::random(), true)),
            settings: None,
        };
        assert_eq!(state.phase(), SessionPhase::SyncingProfile);
        assert!(!state.is_admin());

        state.identity = None;
        assert!(!state.is_admin());
    }

    #[test]
    fn test_is_admin() {
        let id = ProfileId::random();
        let state = SessionState {
            identity: Some(Identity::new(id, None)),
            profile: Some(profile(id, true)),
            settings: None,
        };
        assert!(state.is_admin());
    }

    #[test]
    fn test_site_name_default() {
        let mut state = SessionState::default();
        assert_eq!(state.site_name("ritwrites"), "ritwrites");

        state.settings = Some(SiteSettings {
            site_name: "Rit Writes".to_owned(),
            ..Default::default()
        });
        assert_eq!(state.site_name("ritwrites"), "Rit Writes");
    }
}
