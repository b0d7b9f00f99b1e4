use dotenvy;

#[derive(Debug)]
pub struct AppConfig {
    pub db_namespace: String,
    pub db_database: String,
    pub db_password: Option<String>,
    pub db_username: Option<String>,
    pub db_url: String,
    pub jwt_secret: String,
    pub is_development: bool,
    pub sendgrid_api_key: String,
    pub sendgrid_api_url: String,
    pub no_reply_email: String,
    pub support_email: String,
    pub sentry_project_link: Option<String>,
    pub init_admin_username: Option<String>,
    pub init_admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let db_namespace = std::env::var("DB_NAMESPACE").unwrap_or("namespace".to_string());
        let db_database = std::env::var("DB_DATABASE").unwrap_or("database".to_string());
        let db_password = std::env::var("DB_PASSWORD").ok();
        let db_username = std::env::var("DB_USERNAME").ok();
        let db_url = std::env::var("DB_URL").expect("Missing DB_URL in env");

        let jwt_secret = std::env::var("JWT_SECRET").expect("Missing JWT_SECRET in env");

        let is_development = std::env::var("DEVELOPMENT")
            .expect("set DEVELOPMENT env var")
            .eq("true");

        let sendgrid_api_key = std::env::var("SENDGRID_API_KEY").unwrap_or_default();
        let sendgrid_api_url = std::env::var("SENDGRID_API_URL")
            .unwrap_or("https://api.sendgrid.com/v3/mail/send".to_string());
        let no_reply_email = std::env::var("NO_REPLY_EMAIL").unwrap_or_default();
        let support_email = std::env::var("SUPPORT_EMAIL").unwrap_or_default();

        let sentry_project_link = std::env::var("SENTRY_PROJECT_LINK").ok();

        let init_admin_username = std::env::var("INIT_ADMIN_USERNAME").ok();
        let init_admin_password = std::env::var("INIT_ADMIN_PASSWORD").ok();

        Self {
            db_namespace,
            db_database,
            db_password,
            db_username,
            db_url,
            jwt_secret,
            is_development,
            sendgrid_api_key,
            sendgrid_api_url,
            no_reply_email,
            support_email,
            sentry_project_link,
            init_admin_username,
            init_admin_password,
        }
    }
}
