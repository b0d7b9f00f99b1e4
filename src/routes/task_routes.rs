use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::task_submission_entity::{TaskSubmission, TaskSubmissionView};
use crate::entities::user_entity::PlatformUserView;
use crate::middleware::admin_auth::AdminAuth;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::CtxResult;
use crate::middleware::mw_ctx::CtxState;
use crate::middleware::utils::extractor_utils::JsonOrFormValidated;
use crate::middleware::utils::string_utils::get_str_thing;
use crate::services::task_service::TaskService;

pub fn routes() -> Router<Arc<CtxState>> {
    Router::new()
        .route("/api/tasks/submit", post(submit_task))
        .route("/api/tasks/my-tasks", get(get_user_tasks))
        .route("/api/tasks/reset/:user_id", patch(reset_user_tasks))
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SubmitTaskInput {
    #[validate(length(min = 3, message = "Product id required"))]
    pub product_id: String,
}

async fn submit_task(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
    JsonOrFormValidated(input): JsonOrFormValidated<SubmitTaskInput>,
) -> CtxResult<Json<TaskSubmission>> {
    let task_service = TaskService::new(&state.db.client, &ctx);
    let submission = task_service
        .submit(&ctx.user_id()?, &input.product_id)
        .await?;
    Ok(Json(submission))
}

async fn get_user_tasks(
    State(state): State<Arc<CtxState>>,
    ctx: Ctx,
) -> CtxResult<Json<Vec<TaskSubmissionView>>> {
    let task_service = TaskService::new(&state.db.client, &ctx);
    let tasks = task_service.get_user_tasks(&ctx.user_id()?).await?;
    Ok(Json(tasks))
}

async fn reset_user_tasks(
    State(state): State<Arc<CtxState>>,
    auth: AdminAuth,
    Path(user_id): Path<String>,
) -> CtxResult<Json<PlatformUserView>> {
    let admin_thing = get_str_thing(&auth.admin_id)?;
    let task_service = TaskService::new(&state.db.client, &auth.ctx);
    let user = task_service
        .reset_user_tasks(&admin_thing, &user_id)
        .await?;
    Ok(Json(user))
}
