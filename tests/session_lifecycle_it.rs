mod common;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bazaar::application_impl::*;
use bazaar::application_port::*;
use bazaar::domain_model::*;
use bazaar::domain_port::Clock;
use common::*;
use jsonwebtoken::Algorithm;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn logout_kills_one_session_and_leaves_fresh_ones_working() {
    let stack = stack();
    let first = stack.login(SELLER).await;
    assert_eq!(stack.authenticate(&first.access_token.0).await.unwrap().user_id, SELLER);

    stack.issuer.logout(&first.access_token).await.unwrap();
    assert_eq!(
        stack.authenticate(&first.access_token.0).await,
        Err(AuthRejection::TokenRevoked)
    );

    let second = stack.login(SELLER).await;
    let identity = stack.authenticate(&second.access_token.0).await.unwrap();
    assert_eq!(identity.user_id, SELLER);
    assert_eq!(identity.username, "alice");
}

#[tokio::test]
async fn logout_also_retires_the_paired_refresh_token() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;

    stack.issuer.logout(&tokens.access_token).await.unwrap();
    assert!(matches!(
        stack.issuer.refresh(&tokens.refresh_token).await,
        Err(SessionError::TokenRevoked)
    ));
}

#[tokio::test]
async fn access_only_logout_keeps_refresh_usable() {
    let stack = stack_with(false);
    let tokens = stack.login(SELLER).await;

    stack.issuer.logout(&tokens.access_token).await.unwrap();
    let rotated = stack.issuer.refresh(&tokens.refresh_token).await.unwrap();
    assert!(stack.authenticate(&rotated.access_token.0).await.is_ok());
}

#[tokio::test]
async fn logout_all_revokes_every_device_of_one_user_only() {
    let stack = stack();
    let phone = stack.login(SELLER).await;
    let laptop = stack.login(SELLER).await;
    let bystander = stack.login(OTHER).await;

    stack.issuer.logout_all(SELLER).await.unwrap();

    for token in [&phone.access_token.0, &laptop.access_token.0] {
        assert_eq!(stack.authenticate(token).await, Err(AuthRejection::TokenRevoked));
    }
    for token in [&phone.refresh_token.0, &laptop.refresh_token.0] {
        assert!(!stack.registry.is_valid(token).await);
    }
    assert!(stack.authenticate(&bystander.access_token.0).await.is_ok());
    assert!(stack.registry.is_valid(&bystander.refresh_token.0).await);
}

#[tokio::test]
async fn expired_access_token_is_reported_as_expired_and_evicted() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;

    stack.clock.advance(ACCESS_TTL - Duration::from_secs(1));
    assert!(stack.authenticate(&tokens.access_token.0).await.is_ok());

    stack.clock.advance(Duration::from_secs(1));
    assert_eq!(
        stack.authenticate(&tokens.access_token.0).await,
        Err(AuthRejection::TokenExpired)
    );
    assert!(!stack.registry.is_valid(&tokens.access_token.0).await);
    // the refresh token outlives the access token and still rotates
    assert!(stack.issuer.refresh(&tokens.refresh_token).await.is_ok());
}

#[tokio::test]
async fn refresh_never_yields_tokens_from_dead_refresh_tokens() {
    let stack = stack();
    let revoked = stack.login(SELLER).await;
    stack.registry.revoke(&revoked.refresh_token.0).await.unwrap();
    assert!(matches!(
        stack.issuer.refresh(&revoked.refresh_token).await,
        Err(SessionError::TokenRevoked)
    ));

    let expiring = stack.login(SELLER).await;
    stack.clock.advance(REFRESH_TTL);
    assert!(matches!(
        stack.issuer.refresh(&expiring.refresh_token).await,
        Err(SessionError::TokenExpired)
    ));
}

#[tokio::test]
async fn registry_entries_never_outlive_embedded_expiry() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;

    let access_ttl = stack.registry.remaining_ttl(&tokens.access_token.0).await.unwrap();
    let refresh_ttl = stack.registry.remaining_ttl(&tokens.refresh_token.0).await.unwrap();
    let now = stack.clock.now();
    assert!(now + access_ttl <= tokens.access_token_expires_at);
    assert!(now + refresh_ttl <= tokens.refresh_token_expires_at);
}

#[tokio::test]
async fn foreign_algorithms_are_rejected_before_the_registry() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;

    // alg=none with a real payload
    let payload = tokens.access_token.0.split('.').nth(1).unwrap().to_string();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let unsigned = format!("{header}.{payload}.");

    // correctly signed, but with an algorithm outside the allow-list
    let hs512 = JwtCodec::new(jwt_config(Algorithm::HS512), stack.clock.clone()).unwrap();
    let input = ClaimsInput {
        subject: SELLER,
        authorities: BTreeSet::from([ROLE_ADMIN.to_string()]),
        session_id: SessionId("forged".into()),
    };
    let (substituted, _) = hs512.issue(&input, ACCESS_TTL).unwrap();
    stack.registry.register(&substituted, SELLER, ACCESS_TTL).await.unwrap();

    for token in [&unsigned, &substituted] {
        let before = stack.store.calls();
        assert_eq!(stack.authenticate(token).await, Err(AuthRejection::TokenInvalid));
        assert_eq!(stack.store.calls(), before, "registry was consulted");
    }
}

#[tokio::test]
async fn registry_outage_fails_closed_for_requests_and_hard_for_login() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;

    stack.store.set_down(true);
    assert_eq!(
        stack.authenticate(&tokens.access_token.0).await,
        Err(AuthRejection::TokenRevoked)
    );
    assert!(matches!(
        stack.issuer.mint(SELLER, BTreeSet::new()).await,
        Err(SessionError::Registry(RegistryError::Store(_)))
    ));

    stack.store.set_down(false);
    assert!(stack.authenticate(&tokens.access_token.0).await.is_ok());
}

#[tokio::test]
async fn directory_changes_apply_before_token_expiry() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;

    stack
        .directory
        .set_authorities(SELLER, [ROLE_USER, ROLE_STAFF]);
    let identity = stack.authenticate(&tokens.access_token.0).await.unwrap();
    assert!(identity.has_any_authority(MODERATOR_AUTHORITIES));

    stack.directory.set_status(SELLER, AccountStatus::Suspended);
    assert_eq!(
        stack.authenticate(&tokens.access_token.0).await,
        Err(AuthRejection::AccountDisabled)
    );
}

#[tokio::test]
async fn suspended_accounts_cannot_refresh_their_way_back() {
    let stack = stack();
    let tokens = stack.login(SELLER).await;
    assert!(
        stack
            .registry
            .remaining_ttl(&tokens.refresh_token.0)
            .await
            .is_some()
    );

    stack.directory.set_status(SELLER, AccountStatus::Banned);
    assert!(matches!(
        stack.issuer.refresh(&tokens.refresh_token).await,
        Err(SessionError::AccountDisabled)
    ));

    stack.directory.set_status(SELLER, AccountStatus::Active);
    let fresh = stack.issuer.refresh(&tokens.refresh_token).await.unwrap();
    assert!(stack.authenticate(&fresh.access_token.0).await.is_ok());
}

#[tokio::test]
async fn concurrent_requests_with_one_token_all_pass() {
    let stack = Arc::new(stack());
    let tokens = stack.login(SELLER).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let stack = stack.clone();
            let token = tokens.access_token.0.clone();
            tokio::spawn(async move { stack.authenticate(&token).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().user_id, SELLER);
    }
}
