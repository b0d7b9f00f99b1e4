use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::{
    middleware::{ctx::Ctx, mw_ctx::CtxState},
    utils::jwt::TokenType,
};

/// Extractor gating admin routes: only tokens of [`TokenType::Admin`] pass.
pub struct AdminAuth {
    pub admin_id: String,
    pub ctx: Ctx,
}

#[async_trait]
impl FromRequestParts<Arc<CtxState>> for AdminAuth {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<CtxState>,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state): State<Arc<CtxState>> = State::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        match parts.headers.typed_get::<Authorization<Bearer>>() {
            Some(token) => match app_state.jwt.decode_by_type(token.token(), TokenType::Admin) {
                Ok(claims) => Ok(AdminAuth {
                    admin_id: claims.auth.clone(),
                    ctx: Ctx::new(Ok(claims.auth), Uuid::new_v4()),
                }),
                Err(_) => Err(StatusCode::UNAUTHORIZED),
            },
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
