use crate::config::AppConfig;
use crate::database::client::Database;
use crate::interfaces::send_email::SendEmailInterface;
use crate::utils::email_sender::EmailSender;
use crate::utils::jwt::JWT;
use chrono::Duration;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub struct CtxState {
    pub db: Database,
    pub is_development: bool,
    pub jwt: JWT,
    pub email_sender: Arc<dyn SendEmailInterface + Send + Sync>,
    pub support_email: String,
}

impl Debug for CtxState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("CtxState")
    }
}

pub async fn create_ctx_state(db: Database, config: &AppConfig) -> Arc<CtxState> {
    let ctx_state = CtxState {
        db,
        is_development: config.is_development,
        jwt: JWT::new(config.jwt_secret.clone(), Duration::days(7)),
        email_sender: Arc::new(EmailSender::new(
            &config.sendgrid_api_key,
            &config.sendgrid_api_url,
            &config.no_reply_email,
        )),
        support_email: config.support_email.clone(),
    };
    Arc::new(ctx_state)
}

pub const JWT_KEY: &str = "jwt";
