//! Integration tests for overlapping identity transitions.
//!
//! A profile read is held open with a gate so a newer transition can land
//! while the older sync is still in flight.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use ritwrites_integration_tests::{TestSite, new_identity, stored_profile, wait_for};

async fn wait_for_reads(site: &TestSite, at_least: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while site.profiles.calls() < at_least {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_switching_users_keeps_newest_profile() {
    let site = TestSite::new();
    let alice = new_identity();
    let bob = new_identity();
    site.profiles.insert(stored_profile(alice.id, true));
    site.profiles.insert(stored_profile(bob.id, false));
    let gate = site.profiles.hold_reads(alice.id);

    let mut session = site.coordinator.observe();
    let task = site.start();

    site.provider.sign_in(alice.clone());
    wait_for_reads(&site, 1).await;

    site.provider.sign_in(bob.clone());
    wait_for(&mut session, |s| {
        s.profile.as_ref().is_some_and(|p| p.id == bob.id)
    })
    .await;

    gate.release();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = site.snapshot();
    assert_eq!(state.identity, Some(bob.clone()));
    assert_eq!(state.profile.unwrap().id, bob.id);
    assert!(!site.snapshot().is_admin());

    task.shutdown().await;
}

#[tokio::test]
async fn test_sign_out_during_sync_stays_signed_out() {
    let site = TestSite::new();
    let user = new_identity();
    site.profiles.insert(stored_profile(user.id, true));
    let gate = site.profiles.hold_reads(user.id);

    let mut session = site.coordinator.observe();
    let task = site.start();

    site.provider.sign_in(user.clone());
    wait_for_reads(&site, 1).await;

    site.provider.sign_out();
    wait_for(&mut session, |s| s.identity.is_none()).await;

    gate.release();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = site.snapshot();
    assert_eq!(state.identity, None);
    assert_eq!(state.profile, None);

    task.shutdown().await;
}

#[tokio::test]
async fn test_direct_calls_supersede_without_the_driver() {
    let site = TestSite::new();
    let first = new_identity();
    let second = new_identity();
    site.profiles.insert(stored_profile(first.id, false));
    let gate = site.profiles.hold_reads(first.id);

    let coordinator = std::sync::Arc::clone(&site.coordinator);
    let slow = {
        let first = first.clone();
        tokio::spawn(async move { coordinator.on_identity_changed(Some(first)).await })
    };
    wait_for_reads(&site, 1).await;

    site.coordinator
        .on_identity_changed(Some(second.clone()))
        .await;
    gate.release();
    slow.await.unwrap();

    let state = site.snapshot();
    assert_eq!(state.identity, Some(second.clone()));
    assert_eq!(state.profile.unwrap().id, second.id);
}

#[tokio::test]
async fn test_resync_of_same_user_keeps_profile_visible() {
    let site = TestSite::new();
    let user = new_identity();
    site.coordinator.on_identity_changed(Some(user.clone())).await;
    let profile = site.snapshot().profile.unwrap();
    let reads_before = site.profiles.calls();

    // Token refresh re-publishes the same identity.
    let gate = site.profiles.hold_reads(user.id);
    let coordinator = std::sync::Arc::clone(&site.coordinator);
    let refresh = {
        let user = user.clone();
        tokio::spawn(async move { coordinator.on_identity_changed(Some(user)).await })
    };
    wait_for_reads(&site, reads_before + 1).await;

    assert_eq!(site.snapshot().profile.as_ref(), Some(&profile));

    gate.release();
    refresh.await.unwrap();
    assert_eq!(site.snapshot().profile, Some(profile));
}
