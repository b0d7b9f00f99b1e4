use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::entities::deposit_entity::Deposit;
use crate::entities::user_entity::PlatformUserView;
use crate::entities::withdrawal_entity::Withdrawal;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::middleware::utils::extractor_utils::JsonOrFormValidated;
use crate::services::user_service::{FundingInput, ProfileUpdateInput, UserDetailsView, UserService};

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/users/profile", get(get_profile))
        .route("/api/users/profile", patch(update_profile))
        .route("/api/users/deposit", post(create_deposit))
        .route("/api/users/withdrawal", post(create_withdrawal))
}

async fn get_profile(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
) -> CtxResult<Json<UserDetailsView>> {
    let user_service = UserService::new(&state.db.client, &ctx);
    let details = user_service.get_user_details(&ctx.user_id()?).await?;
    Ok(Json(details))
}

async fn update_profile(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    JsonOrFormValidated(input): JsonOrFormValidated<ProfileUpdateInput>,
) -> CtxResult<Json<PlatformUserView>> {
    let user_service = UserService::new(&state.db.client, &ctx);
    let updated = user_service.update_profile(&ctx.user_id()?, input).await?;
    Ok(Json(updated))
}

async fn create_deposit(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    JsonOrFormValidated(input): JsonOrFormValidated<FundingInput>,
) -> CtxResult<Json<Deposit>> {
    let user_service = UserService::new(&state.db.client, &ctx);
    let deposit = user_service.create_deposit(&ctx.user_id()?, input).await?;
    Ok(Json(deposit))
}

async fn create_withdrawal(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    JsonOrFormValidated(input): JsonOrFormValidated<FundingInput>,
) -> CtxResult<Json<Withdrawal>> {
    let user_service = UserService::new(&state.db.client, &ctx);
    let withdrawal = user_service
        .create_withdrawal(&ctx.user_id()?, input)
        .await?;
    Ok(Json(withdrawal))
}
