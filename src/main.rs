use std::net::{Ipv4Addr, SocketAddr};

use earnhub_server::config::AppConfig;
use earnhub_server::database::client::{Database, DbConfig};
use earnhub_server::init;
use earnhub_server::middleware::error::AppResult;
use earnhub_server::middleware::mw_ctx;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let _sentry_guard = config.sentry_project_link.as_ref().map(|link| {
        sentry::init((
            link.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let db = Database::connect(DbConfig {
        url: &config.db_url,
        database: &config.db_database,
        namespace: &config.db_namespace,
        username: config.db_username.as_deref(),
        password: config.db_password.as_deref(),
    })
    .await;

    init::run_migrations(&db).await?;

    let ctx_state = mw_ctx::create_ctx_state(db, &config).await;

    if let (Some(username), Some(password)) = (
        config.init_admin_username.as_deref(),
        config.init_admin_password.as_deref(),
    ) {
        init::create_default_admin(&ctx_state, username, password).await;
    }

    let routes_all = init::main_router(&ctx_state).await;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080));
    info!("->> LISTENING on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    axum::serve(listener, routes_all.into_make_service())
        .await
        .unwrap();

    Ok(())
}
