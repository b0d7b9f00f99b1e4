use crate::{
    entities::{
        admin_audit_entity::AdminAuditDbService, admin_entity::AdminDbService,
        deposit_entity::DepositDbService, product_entity::ProductDbService,
        referral_bonus_entity::ReferralBonusDbService,
        task_submission_entity::TaskSubmissionDbService, user_entity::PlatformUserDbService,
        user_task_override_entity::UserTaskOverrideDbService,
        withdrawal_entity::WithdrawalDbService,
    },
    middleware::{ctx::Ctx, error::AppResult, mw_ctx::CtxState},
    routes::{admin_routes, auth_routes, product_routes, task_routes, user_routes},
    services::auth_service::{AdminSignupInput, AuthService},
};
use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use reqwest::StatusCode;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::database::client::Database;

pub async fn run_migrations(database: &Database) -> AppResult<()> {
    let db = database.client.clone();
    let c = Ctx::new(Ok("migrations".to_string()), Uuid::new_v4());

    PlatformUserDbService { db: &db, ctx: &c }.mutate_db().await?;
    AdminDbService { db: &db, ctx: &c }.mutate_db().await?;
    ProductDbService { db: &db, ctx: &c }.mutate_db().await?;
    TaskSubmissionDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    ReferralBonusDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    UserTaskOverrideDbService { db: &db, ctx: &c }
        .mutate_db()
        .await?;
    DepositDbService { db: &db, ctx: &c }.mutate_db().await?;
    WithdrawalDbService { db: &db, ctx: &c }.mutate_db().await?;
    AdminAuditDbService { db: &db, ctx: &c }.mutate_db().await?;
    Ok(())
}

/// Seeds the first admin account from env config, for fresh deployments.
pub async fn create_default_admin(ctx_state: &Arc<CtxState>, username: &str, password: &str) {
    let c = Ctx::new(Ok("create_default_admin".to_string()), Uuid::new_v4());
    let auth_service = AuthService::new(
        &ctx_state.db.client,
        &c,
        &ctx_state.jwt,
        ctx_state.email_sender.clone(),
    );

    let _ = auth_service
        .admin_signup(AdminSignupInput {
            email: format!("{username}@earnhub.local"),
            username: username.to_string(),
            password: password.to_string(),
            name: None,
        })
        .await;
}

pub async fn main_router(ctx_state: &Arc<CtxState>) -> Router {
    Router::new()
        .route("/hc", get(get_hc))
        .merge(auth_routes::routes())
        .merge(task_routes::routes())
        .merge(user_routes::routes())
        .merge(product_routes::routes())
        .merge(admin_routes::routes())
        .with_state(ctx_state.clone())
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn get_hc() -> Response {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    (StatusCode::OK, format!("v{}", VERSION)).into_response()
}
