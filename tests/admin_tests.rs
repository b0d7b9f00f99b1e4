mod helpers;

use earnhub_server::entities::admin_audit_entity::AdminAuditDbService;
use earnhub_server::entities::product_entity::Product;
use earnhub_server::middleware::utils::string_utils::get_str_thing;
use helpers::{create_fake_admin, create_fake_product, create_fake_user, create_test_server, get_user, UserSeed};
use serde_json::json;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn admin_balance_set_is_audited_and_may_go_negative() {
    let (server, ctx_state) = create_test_server().await;

    let (user, _) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 55.0,
            ..Default::default()
        },
    )
    .await;
    let (admin, admin_token) = create_fake_admin(&ctx_state).await;

    let response = server
        .patch(&format!(
            "/api/admin/users/{}/balance",
            user.id.as_ref().unwrap().to_raw()
        ))
        .authorization_bearer(&admin_token)
        .json(&json!({ "balance": -12.5 }))
        .await;
    response.assert_status_success();

    let updated = get_user(&ctx_state, user.id.as_ref().unwrap()).await;
    assert_eq!(updated.balance, -12.5);

    let ctx = helpers::test_ctx();
    let audits = AdminAuditDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    }
    .list_for_admin(admin.id.as_ref().unwrap())
    .await
    .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "update_user_balance");
    assert_eq!(audits[0].target, user.id.as_ref().unwrap().to_raw());
}

#[tokio::test]
#[serial]
async fn reset_user_tasks_zeroes_counter_and_audits() {
    let (server, ctx_state) = create_test_server().await;

    let (user, _) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            completed_tasks: 33,
            ..Default::default()
        },
    )
    .await;
    let (admin, admin_token) = create_fake_admin(&ctx_state).await;

    let response = server
        .patch(&format!(
            "/api/tasks/reset/{}",
            user.id.as_ref().unwrap().to_raw()
        ))
        .authorization_bearer(&admin_token)
        .await;
    response.assert_status_success();

    let updated = get_user(&ctx_state, user.id.as_ref().unwrap()).await;
    assert_eq!(updated.completed_tasks, 0);
    // the reset touches only the counter
    assert_eq!(updated.balance, 100.0);

    let ctx = helpers::test_ctx();
    let audits = AdminAuditDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    }
    .list_for_admin(admin.id.as_ref().unwrap())
    .await
    .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "reset_user_tasks");
}

#[tokio::test]
#[serial]
async fn override_upsert_keeps_one_record_per_pair() {
    let (server, ctx_state) = create_test_server().await;

    let (user, _) = create_fake_user(&ctx_state, UserSeed::default()).await;
    let product = create_fake_product(&ctx_state, 25.0).await;
    let (_, admin_token) = create_fake_admin(&ctx_state).await;

    for amount in [10.0, 7.5] {
        let response = server
            .post("/api/admin/user-negative-override")
            .authorization_bearer(&admin_token)
            .json(&json!({
                "user_id": user.id.as_ref().unwrap().to_raw(),
                "product_ids": [product.id.as_ref().unwrap().to_raw()],
                "negative_amount": amount
            }))
            .await;
        response.assert_status_success();
    }

    use earnhub_server::entities::user_task_override_entity::UserTaskOverrideDbService;
    let ctx = helpers::test_ctx();
    let overrides = UserTaskOverrideDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    };
    let found = overrides
        .find_override(user.id.as_ref().unwrap(), product.id.as_ref().unwrap())
        .await
        .unwrap()
        .expect("override exists");
    // updated in place, not duplicated
    assert_eq!(found.negative_amount, 7.5);
}

#[tokio::test]
#[serial]
async fn dashboard_stats_count_users_and_submissions() {
    let (server, ctx_state) = create_test_server().await;

    let (_, admin_token) = create_fake_admin(&ctx_state).await;
    let (_u1, token1) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            completed_tasks: 5,
            ..Default::default()
        },
    )
    .await;
    let (_u2, token2) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            completed_tasks: 5,
            ..Default::default()
        },
    )
    .await;
    let product = create_fake_product(&ctx_state, 20.0).await;

    for token in [&token1, &token2] {
        let response = server
            .post("/api/tasks/submit")
            .authorization_bearer(token)
            .json(&json!({ "product_id": product.id.as_ref().unwrap().to_raw() }))
            .await;
        response.assert_status_success();
    }

    let withdrawal = server
        .post("/api/users/withdrawal")
        .authorization_bearer(&token1)
        .json(&json!({
            "network": "TRC20",
            "wallet_address": "TXYZabc123",
            "amount": 30.0
        }))
        .await;
    withdrawal.assert_status_success();

    let stats = server
        .get("/api/admin/dashboard/stats")
        .authorization_bearer(&admin_token)
        .await;
    stats.assert_status_success();
    let body = stats.json::<serde_json::Value>();
    assert_eq!(body["total_users"].as_i64().unwrap(), 2);
    assert_eq!(body["total_orders"].as_i64().unwrap(), 2);
    assert_eq!(body["todays_transactions"].as_i64().unwrap(), 2);
    assert_eq!(body["pending_payout"].as_f64().unwrap(), 30.0);
}

#[tokio::test]
#[serial]
async fn available_products_exclude_submitted_and_apply_overrides() {
    let (server, ctx_state) = create_test_server().await;

    let (user, token) = create_fake_user(
        &ctx_state,
        UserSeed {
            balance: 100.0,
            completed_tasks: 5,
            ..Default::default()
        },
    )
    .await;
    let (_, admin_token) = create_fake_admin(&ctx_state).await;

    let submitted = create_fake_product(&ctx_state, 20.0).await;
    let discounted = create_fake_product(&ctx_state, 25.0).await;
    let plain = create_fake_product(&ctx_state, 30.0).await;

    let response = server
        .post("/api/tasks/submit")
        .authorization_bearer(&token)
        .json(&json!({ "product_id": submitted.id.as_ref().unwrap().to_raw() }))
        .await;
    response.assert_status_success();

    let set_override = server
        .post("/api/admin/user-negative-override")
        .authorization_bearer(&admin_token)
        .json(&json!({
            "user_id": user.id.as_ref().unwrap().to_raw(),
            "product_ids": [discounted.id.as_ref().unwrap().to_raw()],
            "negative_amount": 5.0
        }))
        .await;
    set_override.assert_status_success();

    let available = server
        .get("/api/products/available")
        .authorization_bearer(&token)
        .await;
    available.assert_status_success();
    let products = available.json::<Vec<Product>>();

    let ids: Vec<String> = products
        .iter()
        .map(|p| p.id.as_ref().unwrap().to_raw())
        .collect();
    assert!(!ids.contains(&submitted.id.as_ref().unwrap().to_raw()));
    assert!(ids.contains(&plain.id.as_ref().unwrap().to_raw()));

    let discounted_view = products
        .iter()
        .find(|p| p.id == discounted.id)
        .expect("discounted product listed");
    assert_eq!(discounted_view.negative_amount, 5.0);
    let plain_view = products.iter().find(|p| p.id == plain.id).unwrap();
    assert_eq!(plain_view.negative_amount, 30.0);
}

#[tokio::test]
#[serial]
async fn admin_creates_and_updates_products() {
    let (server, _ctx_state) = create_test_server().await;
    let (_, admin_token) = create_fake_admin(&_ctx_state).await;

    let response = server
        .post("/api/admin/products")
        .authorization_bearer(&admin_token)
        .json(&json!({
            "name": "sample product",
            "image": "/uploads/sample.png",
            "price": 120.0,
            "negative_amount": 35.0,
            "end_date": "2030-01-01T00:00:00Z"
        }))
        .await;
    response.assert_status_success();
    let product = response.json::<Product>();
    assert!(product.is_active);
    assert_eq!(product.negative_amount, 35.0);

    let product_id = product.id.as_ref().unwrap().to_raw();
    let update = server
        .patch(&format!("/api/admin/products/{product_id}"))
        .authorization_bearer(&admin_token)
        .json(&json!({ "negative_amount": 40.0, "is_active": false }))
        .await;
    update.assert_status_success();
    let updated = update.json::<Product>();
    assert_eq!(updated.negative_amount, 40.0);
    assert!(!updated.is_active);
    // untouched fields stay
    assert_eq!(updated.name, "sample product");
    assert_eq!(get_str_thing(&product_id).unwrap(), updated.id.unwrap());
}
