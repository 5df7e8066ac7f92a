//! Identity provider contract and change notifications.
//!
//! The provider answers two questions: who is signed in right now
//! ([`IdentityProvider::current_identity`]) and what changed since
//! ([`IdentityProvider::subscribe`]). Notifications carry the latest identity
//! only; a burst of transitions may be observed as its final value, which is
//! all the session coordinator needs since the newest identity always wins.

pub mod supabase;

use async_trait::async_trait;
use tokio::sync::watch;

use ritwrites_core::Identity;

use crate::store::StoreError;

pub use supabase::{AuthClient, AuthError, SupabaseIdentityProvider};

/// Source of authentication state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// One-shot query for the identity that is signed in right now.
    async fn current_identity(&self) -> Result<Option<Identity>, StoreError>;

    /// Subscribe to sign-in / sign-out notifications.
    ///
    /// The subscription only reports transitions that happen after this call.
    fn subscribe(&self) -> IdentitySubscription;
}

/// Long-lived stream of identity transitions.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// cancels it.
#[derive(Debug)]
pub struct IdentitySubscription {
    rx: watch::Receiver<Option<Identity>>,
}

impl IdentitySubscription {
    /// Wait for the next transition and return the identity it produced.
    ///
    /// Returns `None` once the provider has shut down.
    pub async fn changed(&mut self) -> Option<Option<Identity>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Single-writer broadcast of the current identity.
///
/// Providers own one of these and publish every transition through it.
#[derive(Debug)]
pub struct IdentityChannel {
    tx: watch::Sender<Option<Identity>>,
}

impl IdentityChannel {
    /// Create a channel with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a transition to every subscriber.
    ///
    /// Re-publishing the same identity still notifies, so a token refresh
    /// triggers a re-sync.
    pub fn publish(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }

    /// Last published identity.
    #[must_use]
    pub fn latest(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Open a subscription that sees transitions published from now on.
    #[must_use]
    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for IdentityChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ritwrites_core::ProfileId;

    #[tokio::test]
    async fn test_subscription_only_sees_later_transitions() {
        let channel = IdentityChannel::new();
        let first = Identity::new(ProfileId::random(), None);
        channel.publish(Some(first));

        let mut sub = channel.subscribe();
        let second = Identity::new(ProfileId::random(), None);
        channel.publish(Some(second.clone()));

        assert_eq!(sub.changed().await, Some(Some(second)));
    }

    #[tokio::test]
    async fn test_burst_collapses_to_latest() {
        let channel = IdentityChannel::new();
        let mut sub = channel.subscribe();

        channel.publish(Some(Identity::new(ProfileId::random(), None)));
        channel.publish(None);

        assert_eq!(sub.changed().await, Some(None));
        assert_eq!(channel.latest(), None);
    }

    #[tokio::test]
    async fn test_changed_returns_none_after_provider_drop() {
        let channel = IdentityChannel::new();
        let mut sub = channel.subscribe();
        drop(channel);

        assert_eq!(sub.changed().await, None);
    }
}
