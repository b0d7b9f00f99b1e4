use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{
    exists_entity, get_entity, with_not_found_err, IdentIdName, RecordWithId,
};
use middleware::{
    ctx::Ctx,
    error::{AppError, CtxError, CtxResult},
};

/// Administrator principal - a separate identity from platform users, with
/// its own credentials and token type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
}

pub struct AdminDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "admin";

impl<'a> AdminDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS email ON TABLE {TABLE_NAME} TYPE string VALUE string::lowercase($value) ASSERT string::is::email($value);
    DEFINE FIELD IF NOT EXISTS username ON TABLE {TABLE_NAME} TYPE string VALUE string::lowercase($value);
    DEFINE FIELD IF NOT EXISTS name ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS password_hash ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS is_active ON TABLE {TABLE_NAME} TYPE bool DEFAULT true;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_username_idx ON TABLE {TABLE_NAME} COLUMNS username UNIQUE;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_email_idx ON TABLE {TABLE_NAME} COLUMNS email UNIQUE;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate admin");

        Ok(())
    }

    pub async fn exists(&self, ident: IdentIdName) -> CtxResult<Option<Thing>> {
        exists_entity(self.db, TABLE_NAME.to_string(), &ident).await
    }

    pub async fn get(&self, ident: IdentIdName) -> CtxResult<Admin> {
        let opt = get_entity::<Admin>(self.db, TABLE_NAME.to_string(), &ident).await?;
        with_not_found_err(opt, self.ctx, ident.to_string().as_str())
    }

    pub async fn get_by_username(&self, username: &str) -> CtxResult<Admin> {
        self.get(IdentIdName::ColumnIdent {
            column: "username".to_string(),
            val: username.to_lowercase(),
            rec: false,
        })
        .await
    }

    pub async fn create(&self, ct_input: Admin) -> CtxResult<Thing> {
        self.db
            .create(TABLE_NAME)
            .content(ct_input)
            .await
            .map(|v: Option<RecordWithId>| v.unwrap().id)
            .map_err(CtxError::from)
    }
}
