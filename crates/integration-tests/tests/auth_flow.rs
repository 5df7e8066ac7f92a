//! Integration tests for signing in through the auth API.
//!
//! The auth API is mocked with `wiremock`; profiles and settings live in
//! the in-memory stores.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ritwrites_integration_tests::{settings_named, wait_for};
use ritwrites_site::config::SupabaseConfig;
use ritwrites_site::identity::{AuthClient, IdentityProvider, SupabaseIdentityProvider};
use ritwrites_site::memory::{MemoryProfileStore, MemorySettingsStore};
use ritwrites_site::session::SessionProfileCoordinator;
use ritwrites_site::store::{ProfileStore, SettingsStore};

const ANON_KEY: &str = "eyJhbGciOiJIUzI1NiJ9.aB3xY9mK2nL5pQ7rT0uW4zC6dE8fG1hJ";
const USER_ID: &str = "5f1e9a2b-7c3d-4e8f-9a0b-1c2d3e4f5a6b";

struct Fixture {
    server: MockServer,
    profiles: Arc<MemoryProfileStore>,
    provider: Arc<SupabaseIdentityProvider>,
    coordinator: Arc<SessionProfileCoordinator>,
}

async fn fixture() -> Fixture {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer magic-link-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": USER_ID, "email": "writer@example.com" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer expired-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let config = SupabaseConfig {
        url: Url::parse(&server.uri()).unwrap(),
        anon_key: SecretString::from(ANON_KEY),
        timeout: Duration::from_secs(5),
    };
    let provider = Arc::new(SupabaseIdentityProvider::new(
        AuthClient::new(&config).unwrap(),
    ));

    let profiles = Arc::new(MemoryProfileStore::new());
    let settings = Arc::new(MemorySettingsStore::with_settings(settings_named(
        "Rit Writes",
    )));
    let coordinator = Arc::new(SessionProfileCoordinator::new(
        Arc::clone(&profiles) as Arc<dyn ProfileStore>,
        settings as Arc<dyn SettingsStore>,
    ));

    Fixture {
        server,
        profiles,
        provider,
        coordinator,
    }
}

#[tokio::test]
async fn test_magic_link_sign_in_bootstraps_admin() {
    let f = fixture().await;
    let mut session = f.coordinator.observe();
    let task = f
        .coordinator
        .spawn(Arc::clone(&f.provider) as Arc<dyn IdentityProvider>);

    f.provider
        .sign_in_with_token(SecretString::from("magic-link-token"))
        .await
        .unwrap();

    let state = wait_for(&mut session, |s| s.profile.is_some() && s.settings.is_some()).await;
    assert_eq!(state.identity.as_ref().unwrap().id.to_string(), USER_ID);
    assert!(state.is_admin());
    assert_eq!(state.site_name("ritwrites"), "Rit Writes");

    task.shutdown().await;
}

#[tokio::test]
async fn test_sign_out_clears_session_without_profile_calls() {
    let f = fixture().await;
    let mut session = f.coordinator.observe();
    let task = f
        .coordinator
        .spawn(Arc::clone(&f.provider) as Arc<dyn IdentityProvider>);

    f.provider
        .sign_in_with_token(SecretString::from("magic-link-token"))
        .await
        .unwrap();
    wait_for(&mut session, |s| s.profile.is_some()).await;
    let calls = f.profiles.calls();

    f.provider.sign_out().await;
    let state = wait_for(&mut session, |s| s.identity.is_none()).await;

    assert_eq!(state.profile, None);
    assert_eq!(f.profiles.calls(), calls);
    assert_eq!(f.provider.current_identity().await.unwrap(), None);

    let logouts = f
        .server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/auth/v1/logout")
        .count();
    assert_eq!(logouts, 1);

    task.shutdown().await;
}

#[tokio::test]
async fn test_expired_token_stays_signed_out() {
    let f = fixture().await;

    let result = f
        .provider
        .sign_in_with_token(SecretString::from("expired-token"))
        .await;
    assert!(result.is_err());

    f.coordinator.initialize(f.provider.as_ref()).await;

    let state = f.coordinator.snapshot();
    assert_eq!(state.identity, None);
    assert!(f.profiles.is_empty());
    assert!(state.settings.is_some());
}
