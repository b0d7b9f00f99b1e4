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
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub user: Thing,
    pub network: String,
    pub wallet_address: String,
    pub amount: f64,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

pub struct WithdrawalDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "withdrawal";
const USER_TABLE: &str = user_entity::TABLE_NAME;

pub const THROW_WITHDRAWAL_PROCESSED: &str = "Withdrawal already processed";
pub const THROW_WITHDRAW_BALANCE: &str = "Insufficient balance";

impl<'a> WithdrawalDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let pending = WithdrawalStatus::Pending;
        let completed = WithdrawalStatus::Completed;
        let rejected = WithdrawalStatus::Rejected;
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
        mutation.check().expect("should mutate withdrawal");

        Ok(())
    }

    pub async fn create(&self, record: Withdrawal) -> CtxResult<Withdrawal> {
        self.db
            .create(TABLE_NAME)
            .content(record)
            .await
            .map_err(CtxError::from)
            .map(|v: Option<Withdrawal>| v.unwrap())
    }

    pub async fn get(&self, ident: IdentIdName) -> CtxResult<Withdrawal> {
        let opt = get_entity::<Withdrawal>(self.db, TABLE_NAME.to_string(), &ident).await?;
        with_not_found_err(opt, self.ctx, ident.to_string().as_str())
    }

    /// Withdrawals of the user, newest first.
    pub async fn list_for_user(&self, user_id: &Thing) -> CtxResult<Vec<Withdrawal>> {
        get_entity_list::<Withdrawal>(
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

    /// Marks the withdrawal completed and debits the user's balance in one
    /// transaction. Aborts when the withdrawal is not pending anymore or the
    /// balance no longer covers the payout.
    pub async fn approve(&self, withdrawal_id: &Thing) -> CtxResult<Withdrawal> {
        let pending = WithdrawalStatus::Pending.to_string();
        let completed = WithdrawalStatus::Completed.to_string();
        let qry = format!(
            "BEGIN TRANSACTION;
            LET $wd_rec = type::record($withdrawal_id);
            LET $wd = SELECT * FROM ONLY $wd_rec;
            IF $wd.status != '{pending}' {{ THROW \"{THROW_WITHDRAWAL_PROCESSED}\"; }};
            LET $usr = SELECT * FROM ONLY $wd.user;
            IF $usr.balance < $wd.amount {{ THROW \"{THROW_WITHDRAW_BALANCE}\"; }};
            UPDATE $wd_rec SET status = '{completed}';
            UPDATE $wd.user SET balance -= $wd.amount;
        COMMIT TRANSACTION;
        "
        );
        let mut res = self
            .db
            .query(qry)
            .bind(("withdrawal_id", withdrawal_id.to_raw()))
            .await?;
        Self::check_approval_errors(&mut res).map_err(|e| self.ctx.to_ctx_error(e))?;
        self.get(IdentIdName::Id(withdrawal_id.clone())).await
    }

    pub async fn reject(&self, withdrawal_id: &Thing) -> CtxResult<Withdrawal> {
        let withdrawal = self.get(IdentIdName::Id(withdrawal_id.clone())).await?;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(self.ctx.to_ctx_error(AppError::WithdrawalAlreadyProcessed));
        }
        let rejected = WithdrawalStatus::Rejected.to_string();
        let res = self
            .db
            .query(format!("UPDATE $withdrawal_id SET status = '{rejected}';"))
            .bind(("withdrawal_id", withdrawal_id.clone()))
            .await?;
        res.check()?;
        self.get(IdentIdName::Id(withdrawal_id.clone())).await
    }

    /// Sum of pending payouts, for the admin dashboard.
    pub async fn pending_sum(&self) -> CtxResult<f64> {
        let pending = WithdrawalStatus::Pending.to_string();
        let q = format!(
            "SELECT math::sum(amount) AS pending FROM {TABLE_NAME} WHERE status = '{pending}' GROUP ALL;"
        );
        let res: Option<f64> = self.db.query(q).await?.take((0, "pending"))?;
        Ok(res.unwrap_or(0.0))
    }

    fn check_approval_errors(query_response: &mut surrealdb::Response) -> AppResult<()> {
        let errors = query_response.take_errors();
        let query_err = errors.values().fold(None, |ret: Option<AppError>, error| {
            if matches!(
                ret,
                Some(AppError::WithdrawalAlreadyProcessed) | Some(AppError::Generic { .. })
            ) {
                return ret;
            }
            let msg = error.to_string();
            if msg.contains(THROW_WITHDRAWAL_PROCESSED) {
                Some(AppError::WithdrawalAlreadyProcessed)
            } else if msg.contains(THROW_WITHDRAW_BALANCE) {
                Some(AppError::Generic {
                    description: THROW_WITHDRAW_BALANCE.to_string(),
                })
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
