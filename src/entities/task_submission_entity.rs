use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::sql::{Id, Thing};

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{
    get_entity, get_entity_list_view, with_not_found_err, IdentIdName, Pagination, QryBindingsVal,
    QryOrder, ViewFieldSelector,
};
use middleware::{
    ctx::Ctx,
    error::{AppError, AppResult, CtxResult},
};

use super::{referral_bonus_entity, user_entity};

/// Immutable record of one user's claim of one product. Created only inside
/// the submit transaction, never updated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub product: Thing,
    pub profit_earned: f64,
    pub amount_debited: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionProductView {
    pub id: Thing,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub negative_amount: f64,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskSubmissionView {
    pub id: Thing,
    pub product: SubmissionProductView,
    pub profit_earned: f64,
    pub amount_debited: f64,
    pub r_created: Option<DateTime<Utc>>,
}

impl ViewFieldSelector for TaskSubmissionView {
    fn get_select_query_fields() -> String {
        "id, product.{id, name, image, price, negative_amount, end_date, is_active} as product, profit_earned, amount_debited, r_created"
            .to_string()
    }
}

pub struct TaskSubmissionDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "task_submission";
const USER_TABLE: &str = user_entity::TABLE_NAME;
const BONUS_TABLE: &str = referral_bonus_entity::TABLE_NAME;
const PRODUCT_TABLE: &str = super::product_entity::TABLE_NAME;
pub const UNIQUE_SUBMISSION_IDX: &str = "task_submission_user_product_idx";

pub const THROW_NEGATIVE_BALANCE: &str = "Cannot submit task with negative balance";
pub const THROW_MAX_TASKS: &str = "Maximum tasks reached. Please withdraw first";
pub const THROW_UPGRADE: &str = "Upgrade to premium to continue or withdraw first";
pub const THROW_MIN_BALANCE: &str = "Minimum balance of $50 required for first task";
pub const THROW_BALANCE_TOO_LOW: &str = "Insufficient balance for this task";

impl<'a> TaskSubmissionDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS user ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}>;
    DEFINE FIELD IF NOT EXISTS product ON TABLE {TABLE_NAME} TYPE record<{PRODUCT_TABLE}>;
    DEFINE FIELD IF NOT EXISTS profit_earned ON TABLE {TABLE_NAME} TYPE number;
    DEFINE FIELD IF NOT EXISTS amount_debited ON TABLE {TABLE_NAME} TYPE number;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_user_idx ON TABLE {TABLE_NAME} FIELDS user;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_r_created_idx ON TABLE {TABLE_NAME} FIELDS r_created;
    DEFINE INDEX IF NOT EXISTS {UNIQUE_SUBMISSION_IDX} ON TABLE {TABLE_NAME} FIELDS user, product UNIQUE;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate task_submission");

        Ok(())
    }

    pub fn generate_id() -> Thing {
        Thing::from((TABLE_NAME.to_string(), Id::ulid()))
    }

    pub async fn get(&self, ident: IdentIdName) -> CtxResult<TaskSubmission> {
        let opt = get_entity::<TaskSubmission>(self.db, TABLE_NAME.to_string(), &ident).await?;
        with_not_found_err(opt, self.ctx, ident.to_string().as_str())
    }

    pub async fn exists_for(&self, user_id: &Thing, product_id: &Thing) -> CtxResult<bool> {
        let qry = format!(
            "SELECT id FROM {TABLE_NAME} WHERE user = <record>$user_id AND product = <record>$product_id LIMIT 1;"
        );
        let mut res = self
            .db
            .query(qry)
            .bind(("user_id", user_id.to_raw()))
            .bind(("product_id", product_id.to_raw()))
            .await?;
        let found: Option<Thing> = res.take((0, "id"))?;
        Ok(found.is_some())
    }

    /// Submissions of the user, newest first, with product details attached.
    pub async fn list_for_user(&self, user_id: &Thing) -> CtxResult<Vec<TaskSubmissionView>> {
        get_entity_list_view::<TaskSubmissionView>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::ColumnIdent {
                column: "user".to_string(),
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

    /// All-or-nothing submit transaction.
    ///
    /// Re-reads the user row and re-asserts the balance and cap guards under
    /// the transaction so nothing can interleave between validation and the
    /// writes. Profit is derived in-query from the row's balance with the
    /// literal percent arithmetic (`balance * (rate / 100)`), then the
    /// submission insert, the submitter update and the per-referred-user
    /// bonus fan-out either all commit or none do. The unique
    /// (user, product) index aborts a concurrent duplicate at the storage
    /// level.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn get_submit_qry(
        submission_id: &Thing,
        user_id: &Thing,
        product_id: &Thing,
        debit: f64,
        profit_rate: f64,
        max_tasks: i64,
        bonus_rate: f64,
    ) -> AppResult<QryBindingsVal<String>> {
        let qry = format!(
            "BEGIN TRANSACTION;
            LET $user_rec = type::record($user_id);
            LET $product_rec = type::record($product_id);
            LET $submission_rec = type::record($submission_id);
            LET $usr = SELECT * FROM ONLY $user_rec;
            IF $usr.balance < 0 {{ THROW \"{THROW_NEGATIVE_BALANCE}\"; }};
            IF $usr.level == 1 AND $usr.completed_tasks == <int>$max_tasks {{ THROW \"{THROW_UPGRADE}\"; }};
            IF $usr.completed_tasks >= <int>$max_tasks {{ THROW \"{THROW_MAX_TASKS}\"; }};
            IF $usr.completed_tasks == 0 AND $usr.balance < 50 {{ THROW \"{THROW_MIN_BALANCE}\"; }};
            IF $usr.balance < <float>$debit {{ THROW \"{THROW_BALANCE_TOO_LOW}\"; }};
            LET $profit = $usr.balance * (<float>$profit_rate / 100);
            LET $submission = CREATE ONLY $submission_rec CONTENT {{
                user: $user_rec,
                product: $product_rec,
                profit_earned: $profit,
                amount_debited: <float>$debit
            }};
            UPDATE $user_rec SET balance = $usr.balance + $profit - <float>$debit, completed_tasks += 1;
            LET $bonus = $profit * <float>$bonus_rate;
            LET $referred = SELECT VALUE id FROM {USER_TABLE} WHERE referred_by = $user_rec;
            FOR $referred_id IN $referred {{
                CREATE {BONUS_TABLE} CONTENT {{
                    referrer: $user_rec,
                    referred_user: $referred_id,
                    task_submission: $submission.id,
                    bonus_amount: $bonus
                }};
                UPDATE $referred_id SET balance += $bonus;
            }};
        COMMIT TRANSACTION;
        "
        );
        let mut bindings: HashMap<String, String> = HashMap::new();
        bindings.insert("submission_id".to_string(), submission_id.to_raw());
        bindings.insert("user_id".to_string(), user_id.to_raw());
        bindings.insert("product_id".to_string(), product_id.to_raw());
        bindings.insert("debit".to_string(), debit.to_string());
        bindings.insert("profit_rate".to_string(), profit_rate.to_string());
        bindings.insert("max_tasks".to_string(), max_tasks.to_string());
        bindings.insert("bonus_rate".to_string(), bonus_rate.to_string());
        Ok(QryBindingsVal::new(qry, bindings))
    }

    /// Folds transaction errors back into the submission error taxonomy.
    /// A THROWn guard keeps its domain meaning; a violation of the unique
    /// (user, product) index from a concurrent duplicate surfaces as the
    /// already-completed conflict.
    pub(crate) fn check_submit_errors(
        query_response: &mut surrealdb::Response,
    ) -> AppResult<()> {
        let errors = query_response.take_errors();
        let query_err = errors.values().fold(None, |ret: Option<AppError>, error| {
            if matches!(
                ret,
                Some(AppError::NegativeBalance)
                    | Some(AppError::TaskLimitUpgrade)
                    | Some(AppError::TaskLimitWithdraw)
                    | Some(AppError::MinimumBalanceRequired)
                    | Some(AppError::InsufficientFunds)
                    | Some(AppError::TaskAlreadyCompleted)
            ) {
                return ret;
            }

            let msg = error.to_string();
            if msg.contains(THROW_NEGATIVE_BALANCE) {
                Some(AppError::NegativeBalance)
            } else if msg.contains(THROW_UPGRADE) {
                Some(AppError::TaskLimitUpgrade)
            } else if msg.contains(THROW_MAX_TASKS) {
                Some(AppError::TaskLimitWithdraw)
            } else if msg.contains(THROW_MIN_BALANCE) {
                Some(AppError::MinimumBalanceRequired)
            } else if msg.contains(THROW_BALANCE_TOO_LOW) {
                Some(AppError::InsufficientFunds)
            } else if msg.contains(UNIQUE_SUBMISSION_IDX) {
                Some(AppError::TaskAlreadyCompleted)
            } else if msg.contains("not executed") || msg.contains("cancelled") {
                // statements skipped because an earlier one failed
                ret
            } else {
                Some(AppError::SurrealDb { source: msg })
            }
        });
        match query_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    pub async fn submissions_len(&self) -> CtxResult<i64> {
        let q = format!("SELECT count() FROM {TABLE_NAME} GROUP ALL;");
        let res: Option<i64> = self.db.query(q).await?.take((0, "count"))?;
        Ok(res.unwrap_or(0))
    }

    pub async fn submissions_len_since(&self, since: DateTime<Utc>) -> CtxResult<i64> {
        let q = format!(
            "SELECT count() FROM {TABLE_NAME} WHERE r_created >= <datetime>$since GROUP ALL;"
        );
        let res: Option<i64> = self
            .db
            .query(q)
            .bind(("since", since.to_rfc3339()))
            .await?
            .take((0, "count"))?;
        Ok(res.unwrap_or(0))
    }
}
