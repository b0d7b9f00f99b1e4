use surrealdb::sql::Thing;

use crate::{
    database::client::Db,
    entities::{
        admin_audit_entity::{AdminAudit, AdminAuditDbService},
        product_entity::{Product, ProductDbService},
        task_submission_entity::{TaskSubmission, TaskSubmissionDbService, TaskSubmissionView},
        user_entity::{PlatformUser, PlatformUserDbService, PlatformUserView},
        user_task_override_entity::{UserTaskOverride, UserTaskOverrideDbService},
    },
    middleware::{
        ctx::Ctx,
        error::{AppError, CtxResult},
        utils::{db_utils::IdentIdName, string_utils::get_str_thing},
    },
};
use chrono::Utc;

/// Level 1 users stop at 33 tasks, every other level at 38.
const LEVEL_1_MAX_TASKS: i64 = 33;
const LEVEL_OTHER_MAX_TASKS: i64 = 38;
/// Profit rate per completed task, as a percentage of the current balance.
const LEVEL_1_PROFIT_RATE: f64 = 0.75;
const LEVEL_OTHER_PROFIT_RATE: f64 = 1.0;
/// A first-ever task requires this minimum balance.
const FIRST_TASK_MIN_BALANCE: f64 = 50.0;
/// Referred users receive this share of the referrer's profit.
const REFERRAL_BONUS_RATE: f64 = 0.25;

pub(crate) fn max_tasks_for_level(level: u8) -> i64 {
    if level == 1 {
        LEVEL_1_MAX_TASKS
    } else {
        LEVEL_OTHER_MAX_TASKS
    }
}

pub(crate) fn profit_rate_for_level(level: u8) -> f64 {
    if level == 1 {
        LEVEL_1_PROFIT_RATE
    } else {
        LEVEL_OTHER_PROFIT_RATE
    }
}

/// The rate is applied as a percentage of the current balance: a level-1
/// user with balance 100 earns 100 * (0.75 / 100) = 0.75 per task.
pub(crate) fn compute_profit(balance: f64, profit_rate: f64) -> f64 {
    balance * (profit_rate / 100.0)
}

pub(crate) fn check_task_limit(level: u8, completed_tasks: i64) -> Result<(), AppError> {
    if completed_tasks >= max_tasks_for_level(level) {
        if level == 1 && completed_tasks == LEVEL_1_MAX_TASKS {
            return Err(AppError::TaskLimitUpgrade);
        }
        return Err(AppError::TaskLimitWithdraw);
    }
    Ok(())
}

pub(crate) fn resolve_debit(override_rec: Option<&UserTaskOverride>, product: &Product) -> f64 {
    override_rec
        .map(|o| o.negative_amount)
        .unwrap_or(product.negative_amount)
}

pub struct TaskService<'a> {
    users_repository: PlatformUserDbService<'a>,
    products_repository: ProductDbService<'a>,
    submissions_repository: TaskSubmissionDbService<'a>,
    overrides_repository: UserTaskOverrideDbService<'a>,
    audit_repository: AdminAuditDbService<'a>,
    db: &'a Db,
    ctx: &'a Ctx,
}

impl<'a> TaskService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            users_repository: PlatformUserDbService { db, ctx },
            products_repository: ProductDbService { db, ctx },
            submissions_repository: TaskSubmissionDbService { db, ctx },
            overrides_repository: UserTaskOverrideDbService { db, ctx },
            audit_repository: AdminAuditDbService { db, ctx },
            db,
            ctx,
        }
    }

    /// Submits a product task for the user: validates, computes the profit
    /// and debit, then records the submission, the balance/counter update
    /// and the referral-bonus fan-out in one all-or-nothing transaction.
    ///
    /// Preconditions are checked in order and the first failure wins with no
    /// side effects. The transaction itself re-asserts the balance and cap
    /// guards against the row it reads, so a concurrent submission,
    /// withdrawal or deposit approval cannot slip a stale balance through;
    /// the unique (user, product) index turns a concurrent duplicate into
    /// the same already-completed error as the pre-check.
    pub async fn submit(&self, user_id: &str, product_id: &str) -> CtxResult<TaskSubmission> {
        let user_thing = get_str_thing(user_id)?;
        let product_thing = get_str_thing(product_id)?;

        let user = self.get_existing_user(&user_thing).await?;

        if user.balance < 0.0 {
            return Err(self.ctx.to_ctx_error(AppError::NegativeBalance));
        }

        if self
            .submissions_repository
            .exists_for(&user_thing, &product_thing)
            .await?
        {
            return Err(self.ctx.to_ctx_error(AppError::TaskAlreadyCompleted));
        }

        let product = self
            .products_repository
            .find(&product_thing)
            .await?
            .ok_or_else(|| {
                self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                    ident: "Product".to_string(),
                })
            })?;

        if !product.is_available(Utc::now()) {
            return Err(self.ctx.to_ctx_error(AppError::ProductUnavailable));
        }

        if user.completed_tasks == 0 && user.balance < FIRST_TASK_MIN_BALANCE {
            return Err(self.ctx.to_ctx_error(AppError::MinimumBalanceRequired));
        }

        check_task_limit(user.level, user.completed_tasks)
            .map_err(|e| self.ctx.to_ctx_error(e))?;

        let override_rec = self
            .overrides_repository
            .find_override(&user_thing, &product_thing)
            .await?;
        let debit = resolve_debit(override_rec.as_ref(), &product);

        if user.balance < debit {
            return Err(self.ctx.to_ctx_error(AppError::InsufficientFunds));
        }

        let submission_id = TaskSubmissionDbService::generate_id();
        let submit_qry = TaskSubmissionDbService::get_submit_qry(
            &submission_id,
            &user_thing,
            &product_thing,
            debit,
            profit_rate_for_level(user.level),
            max_tasks_for_level(user.level),
            REFERRAL_BONUS_RATE,
        )?;

        let mut res = submit_qry.into_query(self.db).await?;
        TaskSubmissionDbService::check_submit_errors(&mut res)
            .map_err(|e| self.ctx.to_ctx_error(e))?;

        self.submissions_repository
            .get(IdentIdName::Id(submission_id))
            .await
    }

    /// All submissions of the user, newest first, with product details.
    pub async fn get_user_tasks(&self, user_id: &str) -> CtxResult<Vec<TaskSubmissionView>> {
        let user_thing = get_str_thing(user_id)?;
        self.submissions_repository.list_for_user(&user_thing).await
    }

    /// Administrative escape hatch: zeroes the user's task counter,
    /// bypassing every submission invariant on purpose. Records an audit row
    /// against the acting admin.
    pub async fn reset_user_tasks(
        &self,
        admin: &Thing,
        user_id: &str,
    ) -> CtxResult<PlatformUserView> {
        let user_thing = get_str_thing(user_id)?;
        let user = self.get_existing_user(&user_thing).await?;

        self.users_repository
            .reset_completed_tasks(&user_thing)
            .await?;

        self.audit_repository
            .record(AdminAudit {
                id: None,
                admin: admin.clone(),
                action: "reset_user_tasks".to_string(),
                target: user_thing.to_raw(),
                detail: Some(format!("completed_tasks {} -> 0", user.completed_tasks)),
                r_created: None,
            })
            .await?;

        tracing::info!(admin = %admin, user = %user_thing, "admin reset task counter");

        self.users_repository
            .get_view::<PlatformUserView>(IdentIdName::Id(user_thing))
            .await
    }

    async fn get_existing_user(&self, user_thing: &Thing) -> CtxResult<PlatformUser> {
        self.users_repository
            .find(user_thing)
            .await?
            .ok_or_else(|| {
                self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                    ident: "User".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn product(negative_amount: f64) -> Product {
        Product {
            id: None,
            name: "some product".to_string(),
            image: None,
            price: 100.0,
            negative_amount,
            end_date: Utc::now() + Duration::days(1),
            is_active: true,
            r_created: None,
            r_updated: None,
        }
    }

    fn override_rec(negative_amount: f64) -> UserTaskOverride {
        UserTaskOverride {
            id: None,
            user: Thing::from(("platform_user", "u7")),
            product: Thing::from(("product", "p3")),
            negative_amount,
            r_created: None,
            r_updated: None,
        }
    }

    #[test]
    fn profit_is_percent_of_balance() {
        // level 1: 0.75% of the current balance
        assert_eq!(compute_profit(100.0, profit_rate_for_level(1)), 0.75);
        // other levels: 1%
        assert_eq!(compute_profit(100.0, profit_rate_for_level(2)), 1.0);
    }

    #[test]
    fn level_caps() {
        assert_eq!(max_tasks_for_level(1), 33);
        assert_eq!(max_tasks_for_level(2), 38);
        assert_eq!(max_tasks_for_level(3), 38);
    }

    #[test]
    fn task_limit_boundaries() {
        assert!(check_task_limit(1, 32).is_ok());
        assert_eq!(check_task_limit(1, 33), Err(AppError::TaskLimitUpgrade));
        assert_eq!(check_task_limit(1, 34), Err(AppError::TaskLimitWithdraw));
        assert!(check_task_limit(2, 37).is_ok());
        assert_eq!(check_task_limit(2, 38), Err(AppError::TaskLimitWithdraw));
    }

    #[test]
    fn override_takes_precedence_over_product_default() {
        let product = product(25.0);
        let with_override = override_rec(10.0);
        assert_eq!(resolve_debit(Some(&with_override), &product), 10.0);
        assert_eq!(resolve_debit(None, &product), 25.0);
    }

    #[test]
    fn expired_or_inactive_product_is_unavailable() {
        let now = Utc::now();
        let mut p = product(25.0);
        assert!(p.is_available(now));
        p.is_active = false;
        assert!(!p.is_available(now));
        p.is_active = true;
        p.end_date = now - Duration::seconds(1);
        assert!(!p.is_available(now));
        p.end_date = now;
        assert!(!p.is_available(now));
    }
}
