use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{get_entity_list, IdentIdName, Pagination, QryOrder};
use middleware::{
    ctx::Ctx,
    error::{AppError, CtxError, CtxResult},
};

use super::admin_entity;

/// Audit row for privileged overrides that bypass the engine's invariants
/// (task-counter reset, absolute balance set).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminAudit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub admin: Thing,
    pub action: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
}

pub struct AdminAuditDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "admin_audit";
const ADMIN_TABLE: &str = admin_entity::TABLE_NAME;

impl<'a> AdminAuditDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS admin ON TABLE {TABLE_NAME} TYPE record<{ADMIN_TABLE}>;
    DEFINE FIELD IF NOT EXISTS action ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS target ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS detail ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_admin_idx ON TABLE {TABLE_NAME} FIELDS admin;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate admin_audit");

        Ok(())
    }

    pub async fn record(&self, entry: AdminAudit) -> CtxResult<AdminAudit> {
        self.db
            .create(TABLE_NAME)
            .content(entry)
            .await
            .map_err(CtxError::from)
            .map(|v: Option<AdminAudit>| v.unwrap())
    }

    pub async fn list_for_admin(&self, admin_id: &Thing) -> CtxResult<Vec<AdminAudit>> {
        get_entity_list::<AdminAudit>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::ColumnIdent {
                column: "admin".to_string(),
                val: admin_id.to_raw(),
                rec: true,
            },
            Some(Pagination {
                order_by: Some("r_created".to_string()),
                order_dir: Some(QryOrder::DESC),
                count: i8::MAX,
                start: 0,
            }),
        )
        .await
    }
}
