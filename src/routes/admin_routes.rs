use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use surrealdb::sql::Thing;
use uuid::Uuid;

use crate::entities::deposit_entity::Deposit;
use crate::entities::product_entity::Product;
use crate::entities::user_entity::PlatformUserView;
use crate::entities::user_task_override_entity::UserTaskOverride;
use crate::entities::withdrawal_entity::Withdrawal;
use crate::middleware::admin_auth::AdminAuth;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::middleware::utils::extractor_utils::JsonOrFormValidated;
use crate::middleware::utils::string_utils::get_str_thing;
use crate::services::admin_service::{
    AdminService, AdminUserListView, BalanceUpdateInput, DashboardStats, OverrideInput,
    WalletUpdateInput,
};
use crate::services::auth_service::{AdminSignupInput, AuthService, LoginInput};
use crate::services::product_service::{ProductInput, ProductService, ProductUpdateInput};
use crate::services::user_service::{UserDetailsView, UserService};

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/admin/signup", post(admin_signup))
        .route("/api/admin/login", post(admin_login))
        .route("/api/admin/users", get(get_all_users))
        .route("/api/admin/users/:user_id", get(get_user_details))
        .route("/api/admin/users/:user_id/balance", patch(update_user_balance))
        .route("/api/admin/users/:user_id/wallet", patch(update_user_wallet))
        .route("/api/admin/users/:user_id/deposits", get(get_user_deposits))
        .route("/api/admin/user-negative-override", post(set_user_override))
        .route("/api/admin/deposits/:deposit_id/approve", patch(approve_deposit))
        .route("/api/admin/deposits/:deposit_id/reject", patch(reject_deposit))
        .route(
            "/api/admin/withdrawals/:withdrawal_id/approve",
            patch(approve_withdrawal),
        )
        .route(
            "/api/admin/withdrawals/:withdrawal_id/reject",
            patch(reject_withdrawal),
        )
        .route("/api/admin/dashboard/stats", get(get_dashboard_stats))
        .route("/api/admin/products", post(create_product))
        .route("/api/admin/products/:product_id", patch(update_product))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub access_token: String,
    pub admin: AdminLoginView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginView {
    pub id: Thing,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
}

async fn admin_signup(
    State(state): State<Arc<CtxState>>,
    JsonOrFormValidated(input): JsonOrFormValidated<AdminSignupInput>,
) -> CtxResult<Json<serde_json::Value>> {
    let ctx = Ctx::new(Ok("admin_signup".to_string()), Uuid::new_v4());
    let auth_service = AuthService::new(
        &state.db.client,
        &ctx,
        &state.jwt,
        state.email_sender.clone(),
    );

    let admin = auth_service.admin_signup(input).await?;

    Ok(Json(json!({
        "message": "Admin created successfully",
        "admin": {
            "id": admin.id,
            "email": admin.email,
            "username": admin.username,
            "name": admin.name,
        }
    })))
}

async fn admin_login(
    State(state): State<Arc<CtxState>>,
    JsonOrFormValidated(input): JsonOrFormValidated<LoginInput>,
) -> CtxResult<Json<AdminLoginResponse>> {
    let ctx = Ctx::new(Ok("admin_login".to_string()), Uuid::new_v4());
    let auth_service = AuthService::new(
        &state.db.client,
        &ctx,
        &state.jwt,
        state.email_sender.clone(),
    );

    let (token, admin) = auth_service.admin_login(input).await?;

    Ok(Json(AdminLoginResponse {
        access_token: token,
        admin: AdminLoginView {
            id: admin.id.unwrap(),
            username: admin.username,
            email: admin.email,
            name: admin.name,
        },
    }))
}

async fn get_all_users(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
) -> CtxResult<Json<Vec<AdminUserListView>>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.get_all_users().await?))
}

async fn get_user_details(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(user_id): Path<String>,
) -> CtxResult<Json<UserDetailsView>> {
    let user_service = UserService::new(&state.db.client, &auth.ctx);
    Ok(Json(user_service.get_user_details(&user_id).await?))
}

async fn update_user_balance(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(user_id): Path<String>,
    JsonOrFormValidated(input): JsonOrFormValidated<BalanceUpdateInput>,
) -> CtxResult<Json<PlatformUserView>> {
    let admin_thing = get_str_thing(&auth.admin_id)?;
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    let user = admin_service
        .update_user_balance(&admin_thing, &user_id, input.balance)
        .await?;
    Ok(Json(user))
}

async fn update_user_wallet(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(user_id): Path<String>,
    JsonOrFormValidated(input): JsonOrFormValidated<WalletUpdateInput>,
) -> CtxResult<Json<PlatformUserView>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.update_user_wallet(&user_id, input).await?))
}

async fn get_user_deposits(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(user_id): Path<String>,
) -> CtxResult<Json<Vec<Deposit>>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.get_user_deposits(&user_id).await?))
}

async fn set_user_override(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    JsonOrFormValidated(input): JsonOrFormValidated<OverrideInput>,
) -> CtxResult<Json<Vec<UserTaskOverride>>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.set_user_task_override(input).await?))
}

async fn approve_deposit(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(deposit_id): Path<String>,
) -> CtxResult<Json<Deposit>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.approve_deposit(&deposit_id).await?))
}

async fn reject_deposit(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(deposit_id): Path<String>,
) -> CtxResult<Json<Deposit>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.reject_deposit(&deposit_id).await?))
}

async fn approve_withdrawal(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(withdrawal_id): Path<String>,
) -> CtxResult<Json<Withdrawal>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.approve_withdrawal(&withdrawal_id).await?))
}

async fn reject_withdrawal(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(withdrawal_id): Path<String>,
) -> CtxResult<Json<Withdrawal>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.reject_withdrawal(&withdrawal_id).await?))
}

async fn get_dashboard_stats(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
) -> CtxResult<Json<DashboardStats>> {
    let admin_service = AdminService::new(&state.db.client, &auth.ctx);
    Ok(Json(admin_service.get_dashboard_stats().await?))
}

async fn create_product(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    JsonOrFormValidated(input): JsonOrFormValidated<ProductInput>,
) -> CtxResult<Json<Product>> {
    let product_service = ProductService::new(&state.db.client, &auth.ctx);
    Ok(Json(product_service.create(input).await?))
}

async fn update_product(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(product_id): Path<String>,
    JsonOrFormValidated(input): JsonOrFormValidated<ProductUpdateInput>,
) -> CtxResult<Json<Product>> {
    let product_service = ProductService::new(&state.db.client, &auth.ctx);
    Ok(Json(product_service.update(&product_id, input).await?))
}
