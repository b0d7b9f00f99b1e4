use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{get_entity, IdentIdName};
use middleware::{ctx::Ctx, error::AppError, error::CtxResult};

use super::{product_entity, user_entity};

/// Per-(user, product) replacement of the product's default debit. At most
/// one per pair - writes go through `upsert`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserTaskOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub product: Thing,
    pub negative_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

pub struct UserTaskOverrideDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "user_task_override";
const USER_TABLE: &str = user_entity::TABLE_NAME;
const PRODUCT_TABLE: &str = product_entity::TABLE_NAME;

impl<'a> UserTaskOverrideDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS user ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}>;
    DEFINE FIELD IF NOT EXISTS product ON TABLE {TABLE_NAME} TYPE record<{PRODUCT_TABLE}>;
    DEFINE FIELD IF NOT EXISTS negative_amount ON TABLE {TABLE_NAME} TYPE number ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE FIELD IF NOT EXISTS r_updated ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_user_product_idx ON TABLE {TABLE_NAME} FIELDS user, product UNIQUE;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate user_task_override");

        Ok(())
    }

    pub async fn find_override(
        &self,
        user_id: &Thing,
        product_id: &Thing,
    ) -> CtxResult<Option<UserTaskOverride>> {
        get_entity::<UserTaskOverride>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::ColumnIdentAnd(vec![
                IdentIdName::ColumnIdent {
                    column: "user".to_string(),
                    val: user_id.to_raw(),
                    rec: true,
                },
                IdentIdName::ColumnIdent {
                    column: "product".to_string(),
                    val: product_id.to_raw(),
                    rec: true,
                },
            ]),
        )
        .await
    }

    /// Upsert keyed on the (user, product) pair.
    pub async fn upsert(
        &self,
        user_id: &Thing,
        product_id: &Thing,
        negative_amount: f64,
    ) -> CtxResult<UserTaskOverride> {
        let qry = format!(
            "UPSERT {TABLE_NAME} SET
                user = <record>$user_id,
                product = <record>$product_id,
                negative_amount = <float>$negative_amount
            WHERE user = <record>$user_id AND product = <record>$product_id;"
        );
        let mut res = self
            .db
            .query(qry)
            .bind(("user_id", user_id.to_raw()))
            .bind(("product_id", product_id.to_raw()))
            .bind(("negative_amount", negative_amount))
            .await?;
        let upserted: Vec<UserTaskOverride> = res.take(0)?;
        upserted.into_iter().next().ok_or_else(|| {
            self.ctx.to_ctx_error(AppError::SurrealDb {
                source: "override upsert returned no record".to_string(),
            })
        })
    }
}
