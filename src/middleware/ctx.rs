use std::sync::Arc;

use super::error::{AppError, AppResult, CtxError, CtxResult};
use crate::middleware::mw_ctx::{CtxState, JWT_KEY};
use crate::utils::jwt::TokenType;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use reqwest::StatusCode;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Ctx {
    result_user_id: AppResult<String>,
    req_id: Uuid,
}

impl Ctx {
    pub fn new(result_user_id: AppResult<String>, req_id: Uuid) -> Self {
        Self {
            result_user_id,
            req_id,
        }
    }

    pub fn user_id(&self) -> CtxResult<String> {
        self.result_user_id.clone().map_err(|error| CtxError {
            error,
            req_id: self.req_id,
        })
    }

    pub fn req_id(&self) -> Uuid {
        self.req_id
    }

    pub fn to_ctx_error(&self, error: AppError) -> CtxError {
        CtxError {
            error,
            req_id: self.req_id,
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<CtxState>> for Ctx {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<CtxState>,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state): State<Arc<CtxState>> = State::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        // bearer token wins, jwt cookie is the fallback
        let token = match parts.headers.typed_get::<Authorization<Bearer>>() {
            Some(bearer) => Some(bearer.token().to_string()),
            None => CookieJar::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|jar| jar.get(JWT_KEY).map(|c| c.value().to_string())),
        };

        let jwt_user_id: AppResult<String> = match token {
            Some(token) => match app_state.jwt.decode_by_type(&token, TokenType::Login) {
                Ok(claims) => Ok(claims.auth),
                Err(source) => Err(AppError::AuthFailJwtInvalid { source }),
            },
            None => Err(AppError::AuthFailNoJwtToken),
        };

        Ok(Ctx::new(jwt_user_id, Uuid::new_v4()))
    }
}
