use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{
    get_entity, get_entity_list, with_not_found_err, IdentIdName, Pagination, QryOrder,
};
use middleware::{
    ctx::Ctx,
    error::{AppError, AppResult, CtxError, CtxResult},
};

use super::user_entity;

#[derive(Display, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Completed,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deposit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub network: String,
    pub wallet_address: String,
    pub amount: f64,
    pub status: DepositStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

pub struct DepositDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "deposit";
const USER_TABLE: &str = user_entity::TABLE_NAME;

pub const THROW_DEPOSIT_PROCESSED: &str = "Deposit already processed";

impl<'a> DepositDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let pending = DepositStatus::Pending;
        let completed = DepositStatus::Completed;
        let rejected = DepositStatus::Rejected;
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS user ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}>;
    DEFINE FIELD IF NOT EXISTS network ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS wallet_address ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS amount ON TABLE {TABLE_NAME} TYPE number ASSERT $value > 0;
    DEFINE FIELD IF NOT EXISTS status ON TABLE {TABLE_NAME} TYPE string DEFAULT '{pending}' ASSERT $value INSIDE ['{pending}','{completed}','{rejected}'];
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE FIELD IF NOT EXISTS r_updated ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_user_idx ON TABLE {TABLE_NAME} FIELDS user;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_status_idx ON TABLE {TABLE_NAME} FIELDS status;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate deposit");

        Ok(())
    }

    pub async fn create(&self, record: Deposit) -> CtxResult<Deposit> {
        self.db
            .create(TABLE_NAME)
            .content(record)
            .await
            .map_err(CtxError::from)
            .map(|v: Option<Deposit>| v.unwrap())
    }

    pub async fn get(&self, ident: IdentIdName) -> CtxResult<Deposit> {
        let opt = get_entity::<Deposit>(self.db, TABLE_NAME.to_string(), &ident).await?;
        with_not_found_err(opt, self.ctx, ident.to_string().as_str())
    }

    /// Deposits of the user, newest first.
    pub async fn list_for_user(&self, user_id: &Thing) -> CtxResult<Vec<Deposit>> {
        get_entity_list::<Deposit>(
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

    /// Marks the deposit completed and credits the user's balance in one
    /// transaction. A non-pending deposit aborts - approving twice must not
    /// credit twice.
    pub async fn approve(&self, deposit_id: &Thing) -> CtxResult<Deposit> {
        let pending = DepositStatus::Pending.to_string();
        let completed = DepositStatus::Completed.to_string();
        let qry = format!(
            "BEGIN TRANSACTION;
            LET $dep_rec = type::record($deposit_id);
            LET $dep = SELECT * FROM ONLY $dep_rec;
            IF $dep.status != '{pending}' {{ THROW \"{THROW_DEPOSIT_PROCESSED}\"; }};
            UPDATE $dep_rec SET status = '{completed}';
            UPDATE $dep.user SET balance += $dep.amount;
        COMMIT TRANSACTION;
        "
        );
        let mut res = self
            .db
            .query(qry)
            .bind(("deposit_id", deposit_id.to_raw()))
            .await?;
        Self::check_approval_errors(&mut res).map_err(|e| self.ctx.to_ctx_error(e))?;
        self.get(IdentIdName::Id(deposit_id.clone())).await
    }

    pub async fn reject(&self, deposit_id: &Thing) -> CtxResult<Deposit> {
        let deposit = self.get(IdentIdName::Id(deposit_id.clone())).await?;
        if deposit.status != DepositStatus::Pending {
            return Err(self.ctx.to_ctx_error(AppError::DepositAlreadyProcessed));
        }
        let rejected = DepositStatus::Rejected.to_string();
        let res = self
            .db
            .query(format!("UPDATE $deposit_id SET status = '{rejected}';"))
            .bind(("deposit_id", deposit_id.clone()))
            .await?;
        res.check()?;
        self.get(IdentIdName::Id(deposit_id.clone())).await
    }

    fn check_approval_errors(query_response: &mut surrealdb::Response) -> AppResult<()> {
        let errors = query_response.take_errors();
        let query_err = errors.values().fold(None, |ret: Option<AppError>, error| {
            if let Some(AppError::DepositAlreadyProcessed) = ret {
                return ret;
            }
            let msg = error.to_string();
            if msg.contains(THROW_DEPOSIT_PROCESSED) {
                Some(AppError::DepositAlreadyProcessed)
            } else if msg.contains("not executed") || msg.contains("cancelled") {
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
}
