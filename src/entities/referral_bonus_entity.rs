use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{
    get_entity_list_view, IdentIdName, Pagination, QryOrder, ViewFieldSelector,
};
use middleware::{ctx::Ctx, error::AppError, error::CtxResult};

use super::{task_submission_entity, user_entity};

/// Immutable record of a bonus credited to a referred user because their
/// referrer completed a task. Created only inside the submit transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralBonus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub referrer: Thing,
    pub referred_user: Thing,
    pub task_submission: Thing,
    pub bonus_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferralBonusView {
    pub id: Thing,
    pub referrer: ReferrerView,
    pub bonus_amount: f64,
    pub r_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferrerView {
    pub id: Thing,
    pub username: String,
}

impl ViewFieldSelector for ReferralBonusView {
    fn get_select_query_fields() -> String {
        "id, referrer.{id, username} as referrer, bonus_amount, r_created".to_string()
    }
}

pub struct ReferralBonusDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "referral_bonus";
const USER_TABLE: &str = user_entity::TABLE_NAME;
const SUBMISSION_TABLE: &str = task_submission_entity::TABLE_NAME;

impl<'a> ReferralBonusDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS referrer ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}>;
    DEFINE FIELD IF NOT EXISTS referred_user ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}>;
    DEFINE FIELD IF NOT EXISTS task_submission ON TABLE {TABLE_NAME} TYPE record<{SUBMISSION_TABLE}>;
    DEFINE FIELD IF NOT EXISTS bonus_amount ON TABLE {TABLE_NAME} TYPE number;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_referred_user_idx ON TABLE {TABLE_NAME} FIELDS referred_user;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_task_submission_idx ON TABLE {TABLE_NAME} FIELDS task_submission;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate referral_bonus");

        Ok(())
    }

    /// Bonuses credited to the given (referred) user, newest first.
    pub async fn list_for_referred_user(
        &self,
        user_id: &Thing,
    ) -> CtxResult<Vec<ReferralBonusView>> {
        get_entity_list_view::<ReferralBonusView>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::ColumnIdent {
                column: "referred_user".to_string(),
                val: user_id.to_raw(),
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

    pub async fn count_for_submission(&self, submission_id: &Thing) -> CtxResult<i64> {
        let q = format!(
            "SELECT count() FROM {TABLE_NAME} WHERE task_submission = <record>$submission_id GROUP ALL;"
        );
        let res: Option<i64> = self
            .db
            .query(q)
            .bind(("submission_id", submission_id.to_raw()))
            .await?
            .take((0, "count"))?;
        Ok(res.unwrap_or(0))
    }
}
