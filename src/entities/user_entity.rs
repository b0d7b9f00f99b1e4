use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::error::AppError::EntityFailIdNotFound;
use middleware::utils::db_utils::{
    exists_entity, get_entity, get_entity_list, get_entity_view, with_not_found_err, IdentIdName,
    RecordWithId, ViewFieldSelector,
};
use middleware::utils::string_utils::get_string_thing;
use middleware::{
    ctx::Ctx,
    error::{AppError, CtxError, CtxResult},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_network: Option<String>,
    pub password_hash: String,
    /// Currency balance. May go negative only through an administrative
    /// override, never through task submission.
    pub balance: f64,
    /// 1 = standard, 2 = premium.
    pub level: u8,
    pub completed_tasks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<Thing>,
    pub referral_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

/// Public profile shape returned to the user - never exposes password_hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlatformUserView {
    pub id: Thing,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub name: Option<String>,
    pub country: Option<String>,
    pub profile_picture: Option<String>,
    pub wallet_address: Option<String>,
    pub wallet_network: Option<String>,
    pub balance: f64,
    pub level: u8,
    pub completed_tasks: i64,
    pub referral_code: String,
    pub r_created: Option<DateTime<Utc>>,
}

impl ViewFieldSelector for PlatformUserView {
    fn get_select_query_fields() -> String {
        "id, username, email, phone, name, country, profile_picture, wallet_address, wallet_network, balance, level, completed_tasks, referral_code, r_created"
            .to_string()
    }
}

pub struct PlatformUserDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "platform_user";

impl<'a> PlatformUserDbService<'a> {
    pub fn get_table_name() -> &'static str {
        TABLE_NAME
    }

    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS username ON TABLE {TABLE_NAME} TYPE string VALUE string::lowercase($value);
    DEFINE FIELD IF NOT EXISTS email ON TABLE {TABLE_NAME} TYPE string VALUE string::lowercase($value) ASSERT string::is::email($value);
    DEFINE FIELD IF NOT EXISTS phone ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS name ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS country ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS profile_picture ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS wallet_address ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS wallet_network ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS password_hash ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS balance ON TABLE {TABLE_NAME} TYPE number DEFAULT 0;
    DEFINE FIELD IF NOT EXISTS level ON TABLE {TABLE_NAME} TYPE int DEFAULT 1 ASSERT $value >= 1;
    DEFINE FIELD IF NOT EXISTS completed_tasks ON TABLE {TABLE_NAME} TYPE int DEFAULT 0 ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS referred_by ON TABLE {TABLE_NAME} TYPE option<record<{TABLE_NAME}>>;
    DEFINE FIELD IF NOT EXISTS referral_code ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS invite_code ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE FIELD IF NOT EXISTS r_updated ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_username_idx ON TABLE {TABLE_NAME} COLUMNS username UNIQUE;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_email_idx ON TABLE {TABLE_NAME} COLUMNS email UNIQUE;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_referral_code_idx ON TABLE {TABLE_NAME} COLUMNS referral_code UNIQUE;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_referred_by_idx ON TABLE {TABLE_NAME} COLUMNS referred_by;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate platform_user");

        Ok(())
    }

    pub async fn get_ctx_user_thing(&self) -> CtxResult<Thing> {
        let created_by = self.ctx.user_id()?;
        let user_id = get_string_thing(created_by.clone())?;
        let existing_id = self.exists(IdentIdName::Id(user_id.clone())).await?;
        match existing_id {
            None => Err(self
                .ctx
                .to_ctx_error(EntityFailIdNotFound { ident: created_by })),
            Some(_uid) => Ok(user_id),
        }
    }

    pub async fn get_ctx_user(&self) -> CtxResult<PlatformUser> {
        let created_by = self.ctx.user_id()?;
        let user_id = get_string_thing(created_by)?;
        self.get(IdentIdName::Id(user_id)).await
    }

    pub async fn exists(&self, ident: IdentIdName) -> CtxResult<Option<Thing>> {
        exists_entity(self.db, TABLE_NAME.to_string(), &ident).await
    }

    pub async fn get(&self, ident: IdentIdName) -> CtxResult<PlatformUser> {
        let opt = get_entity::<PlatformUser>(self.db, TABLE_NAME.to_string(), &ident).await?;
        with_not_found_err(opt, self.ctx, ident.to_string().as_str())
    }

    pub async fn find(&self, user_id: &Thing) -> CtxResult<Option<PlatformUser>> {
        get_entity::<PlatformUser>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::Id(user_id.clone()),
        )
        .await
    }

    pub async fn get_by_username(&self, username: &str) -> CtxResult<PlatformUser> {
        self.get(IdentIdName::ColumnIdent {
            column: "username".to_string(),
            val: username.to_lowercase(),
            rec: false,
        })
        .await
    }

    pub async fn find_by_referral_code(&self, code: &str) -> CtxResult<Option<PlatformUser>> {
        get_entity::<PlatformUser>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::ColumnIdent {
                column: "referral_code".to_string(),
                val: code.to_string(),
                rec: false,
            },
        )
        .await
    }

    pub async fn get_view<T: for<'b> Deserialize<'b> + ViewFieldSelector>(
        &self,
        ident_id_name: IdentIdName,
    ) -> CtxResult<T> {
        let opt = get_entity_view::<T>(self.db, TABLE_NAME.to_string(), &ident_id_name).await?;
        with_not_found_err(opt, self.ctx, ident_id_name.to_string().as_str())
    }

    pub async fn create(&self, ct_input: PlatformUser) -> CtxResult<Thing> {
        self.db
            .create(TABLE_NAME)
            .content(ct_input)
            .await
            .map(|v: Option<RecordWithId>| v.unwrap().id)
            .map_err(CtxError::from)
    }

    pub async fn update(&self, record: PlatformUser) -> CtxResult<PlatformUser> {
        let resource = record.id.clone().ok_or(AppError::Generic {
            description: "can not update user with no id".to_string(),
        })?;

        let mut record = record;
        record.r_created = None;
        record.r_updated = None;

        let updated: Option<PlatformUser> = self
            .db
            .upsert((resource.tb, resource.id.to_raw()))
            .content(record)
            .await
            .map_err(CtxError::from)?;
        Ok(updated.unwrap())
    }

    /// Administrative absolute balance set - the only write path that may
    /// push a balance negative.
    pub async fn set_balance(&self, user_id: &Thing, balance: f64) -> CtxResult<()> {
        let res = self
            .db
            .query("UPDATE $user_id SET balance = $balance;")
            .bind(("user_id", user_id.clone()))
            .bind(("balance", balance))
            .await?;
        res.check()?;
        Ok(())
    }

    /// Admin escape hatch behind `resetUserTasks` - zeroes the counter and
    /// bypasses every submission invariant on purpose.
    pub async fn reset_completed_tasks(&self, user_id: &Thing) -> CtxResult<()> {
        let res = self
            .db
            .query("UPDATE $user_id SET completed_tasks = 0;")
            .bind(("user_id", user_id.clone()))
            .await?;
        res.check()?;
        Ok(())
    }

    /// Direct referrals of the given user (one level, no recursion).
    pub async fn get_referred_users(&self, user_id: &Thing) -> CtxResult<Vec<PlatformUser>> {
        get_entity_list::<PlatformUser>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::ColumnIdent {
                column: "referred_by".to_string(),
                val: user_id.to_raw(),
                rec: true,
            },
            None,
        )
        .await
    }

    pub async fn users_len(&self) -> CtxResult<i64> {
        let q = format!("SELECT count() FROM {TABLE_NAME} GROUP ALL;");
        let res: Option<i64> = self.db.query(q).await?.take((0, "count"))?;
        Ok(res.unwrap_or(0))
    }
}
