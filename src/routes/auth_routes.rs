use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use surrealdb::sql::Thing;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::{CtxState, JWT_KEY};
use crate::middleware::utils::extractor_utils::JsonOrFormValidated;
use crate::services::auth_service::{AuthService, LoginInput, SignupInput};

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: LoginUserView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUserView {
    pub id: Thing,
    pub username: String,
    pub email: String,
    pub referral_code: String,
}

async fn signup(
    State(state): State<Arc<CtxState>>,
    JsonOrFormValidated(input): JsonOrFormValidated<SignupInput>,
) -> CtxResult<Json<serde_json::Value>> {
    let ctx = Ctx::new(Ok("signup".to_string()), Uuid::new_v4());
    let auth_service = AuthService::new(
        &state.db.client,
        &ctx,
        &state.jwt,
        state.email_sender.clone(),
    );

    auth_service.signup(input).await?;

    Ok(Json(json!({
        "message": "User created successfully. Check your email for login credentials."
    })))
}

async fn login(
    State(state): State<Arc<CtxState>>,
    cookies: Cookies,
    JsonOrFormValidated(input): JsonOrFormValidated<LoginInput>,
) -> CtxResult<Json<LoginResponse>> {
    let ctx = Ctx::new(Ok("login".to_string()), Uuid::new_v4());
    let auth_service = AuthService::new(
        &state.db.client,
        &ctx,
        &state.jwt,
        state.email_sender.clone(),
    );

    let (token, user) = auth_service.login(input).await?;

    let mut cookie = Cookie::new(JWT_KEY, token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.add(cookie);

    Ok(Json(LoginResponse {
        access_token: token,
        user: LoginUserView {
            id: user.id.unwrap(),
            username: user.username,
            email: user.email,
            referral_code: user.referral_code,
        },
    }))
}
