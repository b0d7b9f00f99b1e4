use std::sync::Arc;

use axum_test::{TestServer, TestServerConfig};
use chrono::{Duration, Utc};
use fake::faker::internet::en::FreeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use surrealdb::engine::any::connect;
use surrealdb::sql::Thing;
use uuid::Uuid;

use earnhub_server::config::AppConfig;
use earnhub_server::database::client::Database;
use earnhub_server::entities::admin_entity::{Admin, AdminDbService};
use earnhub_server::entities::product_entity::{Product, ProductCreate, ProductDbService};
use earnhub_server::entities::user_entity::{PlatformUser, PlatformUserDbService};
use earnhub_server::middleware::ctx::Ctx;
use earnhub_server::middleware::mw_ctx::{create_ctx_state, CtxState};
use earnhub_server::middleware::utils::db_utils::IdentIdName;
use earnhub_server::utils::generate::generate_referral_code;
use earnhub_server::utils::hash::hash_password;

#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "some3242paSs#$";

fn test_config() -> AppConfig {
    AppConfig {
        db_namespace: "namespace".to_string(),
        db_database: "database".to_string(),
        db_password: None,
        db_username: None,
        db_url: "mem://".to_string(),
        jwt_secret: "test-secret".to_string(),
        is_development: true,
        sendgrid_api_key: "".to_string(),
        sendgrid_api_url: "".to_string(),
        no_reply_email: "".to_string(),
        support_email: "".to_string(),
        sentry_project_link: None,
        init_admin_username: None,
        init_admin_password: None,
    }
}

async fn init_test_db() -> Database {
    let client = connect("mem://").await.unwrap();
    client
        .use_ns("namespace")
        .use_db("database")
        .await
        .unwrap();
    let db = Database { client };
    earnhub_server::init::run_migrations(&db)
        .await
        .expect("migrations run");
    db
}

#[allow(dead_code)]
pub async fn create_test_server() -> (TestServer, Arc<CtxState>) {
    let db = init_test_db().await;
    let ctx_state = create_ctx_state(db, &test_config()).await;

    let routes_all = earnhub_server::init::main_router(&ctx_state).await;

    let server = TestServer::new_with_config(
        routes_all,
        TestServerConfig {
            transport: None,
            save_cookies: false,
            expect_success_by_default: false,
            restrict_requests_with_http_schema: false,
            default_content_type: None,
            default_scheme: None,
        },
    )
    .expect("Failed to create test server");

    (server, ctx_state)
}

#[allow(dead_code)]
pub fn test_ctx() -> Ctx {
    Ctx::new(Ok("test".to_string()), Uuid::new_v4())
}

fn unique_username() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("user_{}", &suffix[..12])
}

pub struct UserSeed {
    pub balance: f64,
    pub level: u8,
    pub completed_tasks: i64,
    pub referred_by: Option<Thing>,
}

impl Default for UserSeed {
    fn default() -> Self {
        Self {
            balance: 0.0,
            level: 1,
            completed_tasks: 0,
            referred_by: None,
        }
    }
}

/// Creates a user straight through the db service (skipping signup email
/// plumbing) and mints a login token for it.
#[allow(dead_code)]
pub async fn create_fake_user(
    ctx_state: &Arc<CtxState>,
    seed: UserSeed,
) -> (PlatformUser, String) {
    let ctx = test_ctx();
    let users = PlatformUserDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    };

    let user_id = users
        .create(PlatformUser {
            id: None,
            username: unique_username(),
            email: FreeEmail().fake::<String>(),
            phone: "123456789".to_string(),
            name: Some(Name().fake::<String>()),
            country: None,
            profile_picture: None,
            wallet_address: None,
            wallet_network: None,
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            balance: seed.balance,
            level: seed.level,
            completed_tasks: seed.completed_tasks,
            referred_by: seed.referred_by,
            referral_code: generate_referral_code(7),
            invite_code: None,
            r_created: None,
            r_updated: None,
        })
        .await
        .expect("create test user");

    let user = users.get(IdentIdName::Id(user_id.clone())).await.unwrap();
    let token = ctx_state.jwt.create_by_login(&user_id.to_raw()).unwrap();
    (user, token)
}

#[allow(dead_code)]
pub async fn get_user(ctx_state: &Arc<CtxState>, user_id: &Thing) -> PlatformUser {
    let ctx = test_ctx();
    PlatformUserDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    }
    .get(IdentIdName::Id(user_id.clone()))
    .await
    .unwrap()
}

/// Creates an admin straight through the db service and mints an admin
/// token for it.
#[allow(dead_code)]
pub async fn create_fake_admin(ctx_state: &Arc<CtxState>) -> (Admin, String) {
    let ctx = test_ctx();
    let admins = AdminDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    };

    let admin_id = admins
        .create(Admin {
            id: None,
            email: FreeEmail().fake::<String>(),
            username: unique_username(),
            name: None,
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            is_active: true,
            r_created: None,
        })
        .await
        .expect("create test admin");

    let admin = admins.get(IdentIdName::Id(admin_id.clone())).await.unwrap();
    let token = ctx_state.jwt.create_by_admin(&admin_id.to_raw()).unwrap();
    (admin, token)
}

/// Creates an active product ending tomorrow.
#[allow(dead_code)]
pub async fn create_fake_product(ctx_state: &Arc<CtxState>, negative_amount: f64) -> Product {
    let ctx = test_ctx();
    ProductDbService {
        db: &ctx_state.db.client,
        ctx: &ctx,
    }
    .create(ProductCreate {
        name: format!("product {}", generate_referral_code(5)),
        image: None,
        price: 100.0,
        negative_amount,
        end_date: Utc::now() + Duration::days(1),
    })
    .await
    .expect("create test product")
}
