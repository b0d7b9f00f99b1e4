mod helpers;

use helpers::{create_fake_admin, create_fake_user, create_test_server, UserSeed, TEST_PASSWORD};
use serde_json::json;
use serial_test::serial;

use earnhub_server::entities::user_entity::PlatformUserDbService;
use earnhub_server::middleware::error::ErrorResponseBody;

#[tokio::test]
#[serial]
async fn signup_links_referrer_through_invite_code() {
    let (server, ctx_state) = create_test_server().await;

    let (referrer, _) = create_fake_user(&ctx_state, UserSeed::default()).await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "phone": "123456789",
            "email": "newuser@example.com",
            "username": "new_user1",
            "invite_code": referrer.referral_code
        }))
        .await;
    response.assert_status_success();

    let ctx = helpers::test_ctx();
    let users = PlatformUserDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    };
    let created = users.get_by_username("new_user1").await.unwrap();
    assert_eq!(created.referred_by.as_ref(), referrer.id.as_ref());
    assert_eq!(created.level, 1);
    assert_eq!(created.completed_tasks, 0);
    assert_eq!(created.balance, 0.0);
    assert_eq!(created.referral_code.len(), 7);
}

#[tokio::test]
#[serial]
async fn signup_with_unknown_invite_code_still_creates_user() {
    let (server, ctx_state) = create_test_server().await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "phone": "123456789",
            "email": "loner@example.com",
            "username": "loner_user",
            "invite_code": "NOSUCH1"
        }))
        .await;
    response.assert_status_success();

    let ctx = helpers::test_ctx();
    let users = PlatformUserDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    };
    let created = users.get_by_username("loner_user").await.unwrap();
    assert!(created.referred_by.is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_signup_is_rejected() {
    let (server, ctx_state) = create_test_server().await;

    let (existing, _) = create_fake_user(&ctx_state, UserSeed::default()).await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "phone": "123456789",
            "email": "someoneelse@example.com",
            "username": existing.username,
            "invite_code": null
        }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(
        response.json::<ErrorResponseBody>().get_err(),
        "User already exists"
    );
}

#[tokio::test]
#[serial]
async fn login_returns_token_that_opens_user_routes() {
    let (server, ctx_state) = create_test_server().await;

    let (user, _) = create_fake_user(&ctx_state, UserSeed::default()).await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": user.username,
            "password": TEST_PASSWORD
        }))
        .await;
    response.assert_status_success();
    let body = response.json::<serde_json::Value>();
    let token = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["username"].as_str().unwrap(), user.username);

    let profile = server
        .get("/api/users/profile")
        .authorization_bearer(&token)
        .await;
    profile.assert_status_success();
}

#[tokio::test]
#[serial]
async fn login_with_wrong_password_fails() {
    let (server, ctx_state) = create_test_server().await;

    let (user, _) = create_fake_user(&ctx_state, UserSeed::default()).await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": user.username,
            "password": "wrong-password"
        }))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(
        response.json::<ErrorResponseBody>().get_err(),
        "Invalid credentials"
    );
}

#[tokio::test]
#[serial]
async fn user_token_cannot_open_admin_routes() {
    let (server, ctx_state) = create_test_server().await;

    let (_user, token) = create_fake_user(&ctx_state, UserSeed::default()).await;

    let response = server
        .get("/api/admin/users")
        .authorization_bearer(&token)
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
#[serial]
async fn admin_signup_and_login_round_trip() {
    let (server, _ctx_state) = create_test_server().await;

    let response = server
        .post("/api/admin/signup")
        .json(&json!({
            "email": "boss@example.com",
            "username": "boss_admin",
            "password": TEST_PASSWORD,
            "name": "Boss"
        }))
        .await;
    response.assert_status_success();

    let response = server
        .post("/api/admin/login")
        .json(&json!({
            "username": "boss_admin",
            "password": TEST_PASSWORD
        }))
        .await;
    response.assert_status_success();
    let body = response.json::<serde_json::Value>();
    let token = body["access_token"].as_str().unwrap().to_string();

    let users = server
        .get("/api/admin/users")
        .authorization_bearer(&token)
        .await;
    users.assert_status_success();
}

#[tokio::test]
#[serial]
async fn requests_without_token_are_unauthorized() {
    let (server, ctx_state) = create_test_server().await;
    let _ = create_fake_admin(&ctx_state).await;

    let profile = server.get("/api/users/profile").await;
    profile.assert_status_unauthorized();

    let admin = server.get("/api/admin/users").await;
    admin.assert_status_unauthorized();
}
