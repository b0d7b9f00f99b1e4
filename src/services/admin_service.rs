use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::sql::Thing;
use validator::Validate;

use crate::{
    database::client::Db,
    entities::{
        admin_audit_entity::{AdminAudit, AdminAuditDbService},
        deposit_entity::{Deposit, DepositDbService},
        task_submission_entity::TaskSubmissionDbService,
        user_entity::{self, PlatformUserDbService, PlatformUserView},
        user_task_override_entity::{UserTaskOverride, UserTaskOverrideDbService},
        withdrawal_entity::{Withdrawal, WithdrawalDbService},
    },
    middleware::{
        ctx::Ctx,
        error::CtxResult,
        utils::db_utils::{get_list_qry, IdentIdName, QryBindingsVal, ViewFieldSelector},
        utils::string_utils::get_str_thing,
    },
};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BalanceUpdateInput {
    pub balance: f64,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct OverrideInput {
    pub user_id: String,
    #[validate(length(min = 1, message = "At least one product required"))]
    pub product_ids: Vec<String>,
    #[validate(range(min = 0.0))]
    pub negative_amount: f64,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct WalletUpdateInput {
    #[validate(length(min = 4, message = "Min 4 characters for wallet address"))]
    pub wallet_address: String,
    #[validate(length(min = 2, message = "Min 2 characters for network"))]
    pub wallet_network: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_orders: i64,
    pub todays_transactions: i64,
    pub pending_payout: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserListView {
    pub id: Thing,
    pub username: String,
    pub phone: String,
    pub balance: f64,
    pub level: u8,
    pub completed_tasks: i64,
    pub r_created: Option<DateTime<Utc>>,
}

impl ViewFieldSelector for AdminUserListView {
    fn get_select_query_fields() -> String {
        "id, username, phone, balance, level, completed_tasks, r_created".to_string()
    }
}

pub struct AdminService<'a> {
    users_repository: PlatformUserDbService<'a>,
    submissions_repository: TaskSubmissionDbService<'a>,
    overrides_repository: UserTaskOverrideDbService<'a>,
    deposits_repository: DepositDbService<'a>,
    withdrawals_repository: WithdrawalDbService<'a>,
    audit_repository: AdminAuditDbService<'a>,
    db: &'a Db,
}

impl<'a> AdminService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            users_repository: PlatformUserDbService { db, ctx },
            submissions_repository: TaskSubmissionDbService { db, ctx },
            overrides_repository: UserTaskOverrideDbService { db, ctx },
            deposits_repository: DepositDbService { db, ctx },
            withdrawals_repository: WithdrawalDbService { db, ctx },
            audit_repository: AdminAuditDbService { db, ctx },
            db,
        }
    }

    /// Absolute balance set - the administrative override that may push a
    /// balance negative. Audited.
    pub async fn update_user_balance(
        &self,
        admin: &Thing,
        user_id: &str,
        balance: f64,
    ) -> CtxResult<PlatformUserView> {
        let user_thing = get_str_thing(user_id)?;
        let user = self
            .users_repository
            .get(IdentIdName::Id(user_thing.clone()))
            .await?;

        self.users_repository.set_balance(&user_thing, balance).await?;

        self.audit_repository
            .record(AdminAudit {
                id: None,
                admin: admin.clone(),
                action: "update_user_balance".to_string(),
                target: user_thing.to_raw(),
                detail: Some(format!("balance {} -> {}", user.balance, balance)),
                r_created: None,
            })
            .await?;

        tracing::info!(admin = %admin, user = %user_thing, balance, "admin set balance");

        self.users_repository
            .get_view::<PlatformUserView>(IdentIdName::Id(user_thing))
            .await
    }

    /// Upserts the per-(user, product) debit override for every listed
    /// product.
    pub async fn set_user_task_override(
        &self,
        input: OverrideInput,
    ) -> CtxResult<Vec<UserTaskOverride>> {
        input.validate()?;

        let user_thing = get_str_thing(&input.user_id)?;
        self.users_repository
            .exists(IdentIdName::Id(user_thing.clone()))
            .await?;

        let mut upserted = Vec::with_capacity(input.product_ids.len());
        for product_id in &input.product_ids {
            let product_thing = get_str_thing(product_id)?;
            upserted.push(
                self.overrides_repository
                    .upsert(&user_thing, &product_thing, input.negative_amount)
                    .await?,
            );
        }
        Ok(upserted)
    }

    pub async fn update_user_wallet(
        &self,
        user_id: &str,
        input: WalletUpdateInput,
    ) -> CtxResult<PlatformUserView> {
        input.validate()?;

        let user_thing = get_str_thing(user_id)?;
        let mut user = self
            .users_repository
            .get(IdentIdName::Id(user_thing.clone()))
            .await?;
        user.wallet_address = Some(input.wallet_address);
        user.wallet_network = Some(input.wallet_network);
        self.users_repository.update(user).await?;

        self.users_repository
            .get_view::<PlatformUserView>(IdentIdName::Id(user_thing))
            .await
    }

    pub async fn get_dashboard_stats(&self) -> CtxResult<DashboardStats> {
        let today_start = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();

        let total_users = self.users_repository.users_len().await?;
        let total_orders = self.submissions_repository.submissions_len().await?;
        let todays_transactions = self
            .submissions_repository
            .submissions_len_since(today_start)
            .await?;
        let pending_payout = self.withdrawals_repository.pending_sum().await?;

        Ok(DashboardStats {
            total_users,
            total_orders,
            todays_transactions,
            pending_payout,
        })
    }

    /// All platform users, newest first.
    pub async fn get_all_users(&self) -> CtxResult<Vec<AdminUserListView>> {
        let qry = format!(
            "SELECT {} FROM {} ORDER BY r_created DESC;",
            AdminUserListView::get_select_query_fields(),
            user_entity::TABLE_NAME
        );
        get_list_qry(self.db, QryBindingsVal::new(qry, HashMap::new())).await
    }

    pub async fn get_user_deposits(&self, user_id: &str) -> CtxResult<Vec<Deposit>> {
        let user_thing = get_str_thing(user_id)?;
        self.deposits_repository.list_for_user(&user_thing).await
    }

    pub async fn approve_deposit(&self, deposit_id: &str) -> CtxResult<Deposit> {
        let deposit_thing = get_str_thing(deposit_id)?;
        self.deposits_repository.approve(&deposit_thing).await
    }

    pub async fn reject_deposit(&self, deposit_id: &str) -> CtxResult<Deposit> {
        let deposit_thing = get_str_thing(deposit_id)?;
        self.deposits_repository.reject(&deposit_thing).await
    }

    pub async fn approve_withdrawal(&self, withdrawal_id: &str) -> CtxResult<Withdrawal> {
        let withdrawal_thing = get_str_thing(withdrawal_id)?;
        self.withdrawals_repository.approve(&withdrawal_thing).await
    }

    pub async fn reject_withdrawal(&self, withdrawal_id: &str) -> CtxResult<Withdrawal> {
        let withdrawal_thing = get_str_thing(withdrawal_id)?;
        self.withdrawals_repository.reject(&withdrawal_thing).await
    }
}
