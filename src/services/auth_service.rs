use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    database::client::Db,
    entities::{
        admin_entity::{Admin, AdminDbService},
        user_entity::{PlatformUser, PlatformUserDbService},
    },
    interfaces::send_email::SendEmailInterface,
    middleware::{
        ctx::Ctx,
        error::{AppError, CtxResult},
        utils::db_utils::IdentIdName,
    },
    utils::{
        generate::{generate_initial_password, generate_referral_code},
        hash::{hash_password, verify_password},
        jwt::JWT,
        validate_utils::validate_username,
    },
};

const INITIAL_PASSWORD_LEN: usize = 8;
const REFERRAL_CODE_LEN: usize = 7;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 5, message = "Min 5 characters for phone"))]
    pub phone: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = validate_username))]
    pub username: String,
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoginInput {
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(length(min = 6, message = "Min 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct AdminSignupInput {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(length(min = 6, message = "Min 6 characters"))]
    pub password: String,
    pub name: Option<String>,
}

pub struct AuthService<'a> {
    ctx: &'a Ctx,
    jwt: &'a JWT,
    users_repository: PlatformUserDbService<'a>,
    admins_repository: AdminDbService<'a>,
    email_sender: Arc<dyn SendEmailInterface + Send + Sync>,
}

impl<'a> AuthService<'a> {
    pub fn new(
        db: &'a Db,
        ctx: &'a Ctx,
        jwt: &'a JWT,
        email_sender: Arc<dyn SendEmailInterface + Send + Sync>,
    ) -> Self {
        Self {
            ctx,
            jwt,
            users_repository: PlatformUserDbService { db, ctx },
            admins_repository: AdminDbService { db, ctx },
            email_sender,
        }
    }

    /// Creates the user with a generated initial password (mailed to them)
    /// and a unique referral code. A valid invite code links the new user to
    /// its referrer; an unknown code is ignored.
    pub async fn signup(&self, input: SignupInput) -> CtxResult<()> {
        input.validate()?;

        let username_taken = self
            .users_repository
            .exists(IdentIdName::ColumnIdent {
                column: "username".to_string(),
                val: input.username.to_lowercase(),
                rec: false,
            })
            .await?
            .is_some();
        let email_taken = self
            .users_repository
            .exists(IdentIdName::ColumnIdent {
                column: "email".to_string(),
                val: input.email.to_lowercase(),
                rec: false,
            })
            .await?
            .is_some();
        if username_taken || email_taken {
            return Err(self.ctx.to_ctx_error(AppError::Generic {
                description: "User already exists".to_string(),
            }));
        }

        let referred_by = match input.invite_code.as_deref() {
            Some(code) if !code.is_empty() => self
                .users_repository
                .find_by_referral_code(code)
                .await?
                .and_then(|referrer| referrer.id),
            _ => None,
        };

        let password = generate_initial_password(INITIAL_PASSWORD_LEN);
        let password_hash = hash_password(&password)
            .map_err(|e| self.ctx.to_ctx_error(AppError::Generic { description: e }))?;

        self.users_repository
            .create(PlatformUser {
                id: None,
                username: input.username.clone(),
                email: input.email.clone(),
                phone: input.phone,
                name: None,
                country: None,
                profile_picture: None,
                wallet_address: None,
                wallet_network: None,
                password_hash,
                balance: 0.0,
                level: 1,
                completed_tasks: 0,
                referred_by,
                referral_code: generate_referral_code(REFERRAL_CODE_LEN),
                invite_code: input.invite_code,
                r_created: None,
                r_updated: None,
            })
            .await?;

        let body = format!(
            "<p>Welcome! Your login credentials:</p><p>username: {}</p><p>password: {}</p>",
            input.username, password
        );
        self.email_sender
            .send(vec![input.email], &body, "Your login credentials")
            .await
            .map_err(|e| self.ctx.to_ctx_error(AppError::Generic { description: e }))?;

        Ok(())
    }

    pub async fn login(&self, input: LoginInput) -> CtxResult<(String, PlatformUser)> {
        input.validate()?;

        let user = self
            .users_repository
            .get_by_username(&input.username)
            .await
            .map_err(|_| self.ctx.to_ctx_error(AppError::AuthenticationFail))?;

        if !verify_password(&user.password_hash, &input.password) {
            return Err(self.ctx.to_ctx_error(AppError::AuthenticationFail));
        }

        let token = self
            .jwt
            .create_by_login(&user.id.as_ref().unwrap().to_raw())
            .map_err(|e| self.ctx.to_ctx_error(AppError::Generic { description: e }))?;
        Ok((token, user))
    }

    pub async fn admin_signup(&self, input: AdminSignupInput) -> CtxResult<Admin> {
        input.validate()?;

        let username_taken = self
            .admins_repository
            .exists(IdentIdName::ColumnIdent {
                column: "username".to_string(),
                val: input.username.to_lowercase(),
                rec: false,
            })
            .await?
            .is_some();
        let email_taken = self
            .admins_repository
            .exists(IdentIdName::ColumnIdent {
                column: "email".to_string(),
                val: input.email.to_lowercase(),
                rec: false,
            })
            .await?
            .is_some();
        if username_taken || email_taken {
            return Err(self.ctx.to_ctx_error(AppError::Generic {
                description: "Admin already exists".to_string(),
            }));
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| self.ctx.to_ctx_error(AppError::Generic { description: e }))?;

        let admin_id = self
            .admins_repository
            .create(Admin {
                id: None,
                email: input.email,
                username: input.username,
                name: input.name,
                password_hash,
                is_active: true,
                r_created: None,
            })
            .await?;

        self.admins_repository.get(IdentIdName::Id(admin_id)).await
    }

    pub async fn admin_login(&self, input: LoginInput) -> CtxResult<(String, Admin)> {
        input.validate()?;

        let admin = self
            .admins_repository
            .get_by_username(&input.username)
            .await
            .map_err(|_| self.ctx.to_ctx_error(AppError::AuthenticationFail))?;

        if !verify_password(&admin.password_hash, &input.password) {
            return Err(self.ctx.to_ctx_error(AppError::AuthenticationFail));
        }

        if !admin.is_active {
            return Err(self.ctx.to_ctx_error(AppError::AuthorizationFail {
                required: "active admin account".to_string(),
            }));
        }

        let token = self
            .jwt
            .create_by_admin(&admin.id.as_ref().unwrap().to_raw())
            .map_err(|e| self.ctx.to_ctx_error(AppError::Generic { description: e }))?;
        Ok((token, admin))
    }
}
