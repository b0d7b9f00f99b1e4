use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::entities::product_entity::Product;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::services::product_service::ProductService;

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/products", get(get_active_products))
        .route("/api/products/available", get(get_available_products))
}

async fn get_active_products(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
) -> CtxResult<Json<Vec<Product>>> {
    let product_service = ProductService::new(&state.db.client, &ctx);
    let products = product_service.get_active().await?;
    Ok(Json(products))
}

/// Products the authenticated user can still submit, override-adjusted.
async fn get_available_products(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
) -> CtxResult<Json<Vec<Product>>> {
    let product_service = ProductService::new(&state.db.client, &ctx);
    let products = product_service.get_active_for_user(&ctx.user_id()?).await?;
    Ok(Json(products))
}
