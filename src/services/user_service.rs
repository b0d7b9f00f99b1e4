use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    database::client::Db,
    entities::{
        deposit_entity::{Deposit, DepositDbService, DepositStatus},
        user_entity::{PlatformUserDbService, PlatformUserView},
        withdrawal_entity::{Withdrawal, WithdrawalDbService, WithdrawalStatus},
    },
    middleware::{
        ctx::Ctx,
        error::{AppError, CtxResult},
        utils::db_utils::IdentIdName,
        utils::string_utils::get_str_thing,
    },
    utils::hash::{hash_password, verify_password},
};

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct ProfileUpdateInput {
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub phone: Option<String>,
    pub wallet_network: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub country: Option<String>,
    pub profile_picture: Option<String>,
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "Min 6 characters"))]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct FundingInput {
    #[validate(length(min = 2, message = "Min 2 characters for network"))]
    pub network: String,
    #[validate(length(min = 4, message = "Min 4 characters for wallet address"))]
    pub wallet_address: String,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDetailsView {
    #[serde(flatten)]
    pub user: PlatformUserView,
    pub deposits: Vec<Deposit>,
    pub withdrawals: Vec<Withdrawal>,
}

pub struct UserService<'a> {
    users_repository: PlatformUserDbService<'a>,
    deposits_repository: DepositDbService<'a>,
    withdrawals_repository: WithdrawalDbService<'a>,
    ctx: &'a Ctx,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            users_repository: PlatformUserDbService { db, ctx },
            deposits_repository: DepositDbService { db, ctx },
            withdrawals_repository: WithdrawalDbService { db, ctx },
            ctx,
        }
    }

    /// Partial profile update. A password change requires the current
    /// password to verify.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: ProfileUpdateInput,
    ) -> CtxResult<PlatformUserView> {
        input.validate()?;

        let user_thing = get_str_thing(user_id)?;
        let mut user = self
            .users_repository
            .get(IdentIdName::Id(user_thing.clone()))
            .await?;

        if let Some(name) = input.name {
            user.name = Some(name);
        }
        if let Some(wallet_address) = input.wallet_address {
            user.wallet_address = Some(wallet_address);
        }
        if let Some(phone) = input.phone {
            user.phone = phone;
        }
        if let Some(wallet_network) = input.wallet_network {
            user.wallet_network = Some(wallet_network);
        }
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(country) = input.country {
            user.country = Some(country);
        }
        if let Some(profile_picture) = input.profile_picture {
            user.profile_picture = Some(profile_picture);
        }

        if let (Some(current), Some(new_password)) =
            (input.current_password, input.new_password)
        {
            if !verify_password(&user.password_hash, &current) {
                return Err(self.ctx.to_ctx_error(AppError::Generic {
                    description: "Current password is incorrect".to_string(),
                }));
            }
            user.password_hash = hash_password(&new_password)
                .map_err(|e| self.ctx.to_ctx_error(AppError::Generic { description: e }))?;
        }

        self.users_repository.update(user).await?;
        self.users_repository
            .get_view::<PlatformUserView>(IdentIdName::Id(user_thing))
            .await
    }

    /// Profile plus deposit and withdrawal history, newest first.
    pub async fn get_user_details(&self, user_id: &str) -> CtxResult<UserDetailsView> {
        let user_thing = get_str_thing(user_id)?;
        let user = self
            .users_repository
            .get_view::<PlatformUserView>(IdentIdName::Id(user_thing.clone()))
            .await?;
        let deposits = self.deposits_repository.list_for_user(&user_thing).await?;
        let withdrawals = self
            .withdrawals_repository
            .list_for_user(&user_thing)
            .await?;
        Ok(UserDetailsView {
            user,
            deposits,
            withdrawals,
        })
    }

    /// Records a pending deposit; the balance is only credited when an admin
    /// approves it.
    pub async fn create_deposit(&self, user_id: &str, input: FundingInput) -> CtxResult<Deposit> {
        input.validate()?;

        let user_thing = get_str_thing(user_id)?;
        self.users_repository
            .exists(IdentIdName::Id(user_thing.clone()))
            .await?;

        self.deposits_repository
            .create(Deposit {
                id: None,
                user: user_thing,
                network: input.network,
                wallet_address: input.wallet_address,
                amount: input.amount,
                status: DepositStatus::Pending,
                r_created: None,
                r_updated: None,
            })
            .await
    }

    /// Records a pending withdrawal. Refused when the balance does not cover
    /// the amount; the actual debit happens on admin approval, re-checked
    /// inside that transaction.
    pub async fn create_withdrawal(
        &self,
        user_id: &str,
        input: FundingInput,
    ) -> CtxResult<Withdrawal> {
        input.validate()?;

        let user_thing = get_str_thing(user_id)?;
        let user = self
            .users_repository
            .get(IdentIdName::Id(user_thing.clone()))
            .await?;

        if user.balance < input.amount {
            return Err(self.ctx.to_ctx_error(AppError::Generic {
                description: "Insufficient balance".to_string(),
            }));
        }

        self.withdrawals_repository
            .create(Withdrawal {
                id: None,
                user: user_thing,
                network: input.network,
                wallet_address: input.wallet_address,
                amount: input.amount,
                status: WithdrawalStatus::Pending,
                r_created: None,
                r_updated: None,
            })
            .await
    }
}
