//! Identity issued by the external authentication provider.

use serde::{Deserialize, Serialize};

use super::{Email, ProfileId};

/// A signed-in user as the identity provider reports it.
///
/// This is an opaque handle: the application never mutates it, it only
/// observes sign-in and sign-out transitions. The provider may omit the email
/// (phone or OAuth sign-ins), so it is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider user id, also the key of the matching profile.
    pub id: ProfileId,
    /// Email address on the provider's user record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

impl Identity {
    /// Create an identity handle.
    #[must_use]
    pub const fn new(id: ProfileId, email: Option<Email>) -> Self {
        Self { id, email }
    }
}
