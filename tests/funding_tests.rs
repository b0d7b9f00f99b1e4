mod helpers;

use axum::http::StatusCode;
use earnhub_server::entities::deposit_entity::{Deposit, DepositStatus};
use earnhub_server::entities::withdrawal_entity::{Withdrawal, WithdrawalStatus};
use earnhub_server::middleware::error::ErrorResponseBody;
use helpers::{create_fake_admin, create_fake_user, create_test_server, get_user, UserSeed};
use serde_json::json;
use serial_test::serial;

fn approx_eq(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
}

#[tokio::test]
#[serial]
async fn deposit_approval_credits_balance_once() {
    let (server, ctx_state) = create_test_server().await;

    let (user, token) = create_fake_user(&ctx_state, UserSeed::default()).await;
    let (_, admin_token) = create_fake_admin(&ctx_state).await;

    let response = server
        .post("/api/users/deposit")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 75.5
        }))
        .await;
    response.assert_status_success();
    let deposit = response.json::<Deposit>();
    assert_eq!(deposit.status, DepositStatus::Pending);

    // nothing is credited until approval
    approx_eq(get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance, 0.0);

    let deposit_id = deposit.id.as_ref().unwrap().to_raw();
    let approve = server
        .patch(&format!("/api/admin/deposits/{deposit_id}/approve"))
        .authorization_bearer(&admin_token)
        .await;
    approve.assert_status_success();
    assert_eq!(approve.json::<Deposit>().status, DepositStatus::Completed);

    approx_eq(
        get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance,
        75.5,
    );

    // approving again must not double-credit
    let again = server
        .patch(&format!("/api/admin/deposits/{deposit_id}/approve"))
        .authorization_bearer(&admin_token)
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        again.json::<ErrorResponseBody>().get_err(),
        "Deposit already processed"
    );
    approx_eq(
        get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance,
        75.5,
    );
}

#[tokio::test]
#[serial]
async fn rejected_deposit_credits_nothing() {
    let (server, ctx_state) = create_test_server().await;

    let (user, token) = create_fake_user(&ctx_state, UserSeed::default()).await;
    let (_, admin_token) = create_fake_admin(&ctx_state).await;

    let response = server
        .post("/api/users/deposit")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 40.0
        }))
        .await;
    response.assert_status_success();
    let deposit = response.json::<Deposit>();

    let reject = server
        .patch(&format!(
            "/api/admin/deposits/{}/reject",
            deposit.id.as_ref().unwrap().to_raw()
        ))
        .authorization_bearer(&admin_token)
        .await;
    reject.assert_status_success();
    assert_eq!(reject.json::<Deposit>().status, DepositStatus::Rejected);

    approx_eq(get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance, 0.0);
}

#[tokio::test]
#[serial]
async fn deposit_amount_must_be_positive() {
    let (server, ctx_state) = create_test_server().await;
    let (_user, token) = create_fake_user(&ctx_state, UserSeed::default()).await;

    let response = server
        .post("/api/users/deposit")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 0.0
        }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
#[serial]
async fn withdrawal_requires_covering_balance() {
    let (server, ctx_state) = create_test_server().await;

    let (_user, token) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 30.0,
            ..Default::default()
        },
    )
    .await;

    let response = server
        .post("/api/users/withdrawal")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 50.0
        }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(
        response.json::<ErrorResponseBody>().get_err(),
        "Insufficient balance"
    );
}

#[tokio::test]
#[serial]
async fn withdrawal_approval_debits_balance() {
    let (server, ctx_state) = create_test_server().await;

    let (user, token) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            ..Default::default()
        },
    )
    .await;
    let (_, admin_token) = create_fake_admin(&ctx_state).await;

    let response = server
        .post("/api/users/withdrawal")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 60.0
        }))
        .await;
    response.assert_status_success();
    let withdrawal = response.json::<Withdrawal>();
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);

    // creating the request does not debit yet
    approx_eq(
        get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance,
        100.0,
    );

    let withdrawal_id = withdrawal.id.as_ref().unwrap().to_raw();
    let approve = server
        .patch(&format!("/api/admin/withdrawals/{withdrawal_id}/approve"))
        .authorization_bearer(&admin_token)
        .await;
    approve.assert_status_success();
    assert_eq!(
        approve.json::<Withdrawal>().status,
        WithdrawalStatus::Completed
    );

    approx_eq(
        get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance,
        40.0,
    );

    let again = server
        .patch(&format!("/api/admin/withdrawals/{withdrawal_id}/approve"))
        .authorization_bearer(&admin_token)
        .await;
    again.assert_status(StatusCode::CONFLICT);
    approx_eq(
        get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance,
        40.0,
    );
}

#[tokio::test]
#[serial]
async fn withdrawal_approval_rechecks_balance() {
    let (server, ctx_state) = create_test_server().await;

    let (user, token) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            ..Default::default()
        },
    )
    .await;
    let (_, admin_token) = create_fake_admin(&ctx_state).await;

    let response = server
        .post("/api/users/withdrawal")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 80.0
        }))
        .await;
    response.assert_status_success();
    let withdrawal = response.json::<Withdrawal>();

    // the balance drops before the approval lands
    let set_balance = server
        .patch(&format!(
            "/api/admin/users/{}/balance",
            user.id.as_ref().unwrap().to_raw()
        ))
        .authorization_bearer(&admin_token)
        .json(&json!({ "balance": 10.0 }))
        .await;
    set_balance.assert_status_success();

    let approve = server
        .patch(&format!(
            "/api/admin/withdrawals/{}/approve",
            withdrawal.id.as_ref().unwrap().to_raw()
        ))
        .authorization_bearer(&admin_token)
        .await;
    approve.assert_status_bad_request();
    assert_eq!(
        approve.json::<ErrorResponseBody>().get_err(),
        "Insufficient balance"
    );

    // the withdrawal stays pending, the balance untouched
    approx_eq(
        get_user(&ctx_state, user.id.as_ref().unwrap()).await.balance,
        10.0,
    );
}

#[tokio::test]
#[serial]
async fn profile_lists_funding_history_newest_first() {
    let (server, ctx_state) = create_test_server().await;

    let (_user, token) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            ..Default::default()
        },
    )
    .await;

    for amount in [10.0, 20.0] {
        let response = server
            .post("/api/users/deposit")
            .authorization_bearer(&token)
            .json(&json!({
                "network": "TRC20",
                "wallet_address": "TXYZabc123",
                "amount": amount
            }))
            .await;
        response.assert_status_success();
    }
    let response = server
        .post("/api/users/withdrawal")
        .authorization_bearer(&token)
        .json(&json!({
            "network": "ERC20",
            "wallet_address": "0xdef456",
            "amount": 15.0
        }))
        .await;
    response.assert_status_success();

    let profile = server
        .get("/api/users/profile")
        .authorization_bearer(&token)
        .await;
    profile.assert_status_success();
    let body = profile.json::<serde_json::Value>();

    let deposits = body["deposits"].as_array().unwrap();
    assert_eq!(deposits.len(), 2);
    assert_eq!(deposits[0]["amount"].as_f64().unwrap(), 20.0);
    assert_eq!(deposits[1]["amount"].as_f64().unwrap(), 10.0);

    let withdrawals = body["withdrawals"].as_array().unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert!(body.get("password_hash").is_none());
}
