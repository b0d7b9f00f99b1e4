use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware;
use middleware::utils::db_utils::{
    get_entity, get_list_qry, with_not_found_err, IdentIdName, QryBindingsVal,
};
use middleware::{
    ctx::Ctx,
    error::{AppError, CtxResult},
};

use super::task_submission_entity;
use super::user_task_override_entity;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price: f64,
    /// Default debit applied when the product task is submitted. A
    /// per-(user, product) override takes precedence.
    pub negative_amount: f64,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_updated: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date > now
    }
}

pub struct ProductCreate {
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub negative_amount: f64,
    pub end_date: DateTime<Utc>,
}

#[derive(Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub negative_amount: Option<f64>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

pub struct ProductDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

pub const TABLE_NAME: &str = "product";
const SUBMISSION_TABLE: &str = task_submission_entity::TABLE_NAME;
const OVERRIDE_TABLE: &str = user_task_override_entity::TABLE_NAME;

impl<'a> ProductDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS name ON TABLE {TABLE_NAME} TYPE string;
    DEFINE FIELD IF NOT EXISTS image ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS price ON TABLE {TABLE_NAME} TYPE number ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS negative_amount ON TABLE {TABLE_NAME} TYPE number ASSERT $value >= 0;
    DEFINE FIELD IF NOT EXISTS end_date ON TABLE {TABLE_NAME} TYPE datetime;
    DEFINE FIELD IF NOT EXISTS is_active ON TABLE {TABLE_NAME} TYPE bool DEFAULT true;
    DEFINE FIELD IF NOT EXISTS r_created ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE $before OR time::now();
    DEFINE FIELD IF NOT EXISTS r_updated ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_r_created_idx ON TABLE {TABLE_NAME} FIELDS r_created;
    DEFINE INDEX IF NOT EXISTS {TABLE_NAME}_is_active_idx ON TABLE {TABLE_NAME} FIELDS is_active;
");
        let mutation = self.db.query(sql).await?;
        mutation.check().expect("should mutate product");

        Ok(())
    }

    pub async fn get(&self, ident: IdentIdName) -> CtxResult<Product> {
        let opt = get_entity::<Product>(self.db, TABLE_NAME.to_string(), &ident).await?;
        with_not_found_err(opt, self.ctx, ident.to_string().as_str())
    }

    pub async fn find(&self, product_id: &Thing) -> CtxResult<Option<Product>> {
        get_entity::<Product>(
            self.db,
            TABLE_NAME.to_string(),
            &IdentIdName::Id(product_id.clone()),
        )
        .await
    }

    pub async fn create(&self, create: ProductCreate) -> CtxResult<Product> {
        let qry = format!(
            "CREATE {TABLE_NAME} CONTENT {{
                name: $name,
                image: $image,
                price: <float>$price,
                negative_amount: <float>$negative_amount,
                end_date: <datetime>$end_date,
                is_active: true
            }};"
        );
        let mut res = self
            .db
            .query(qry)
            .bind(("name", create.name))
            .bind(("image", create.image))
            .bind(("price", create.price))
            .bind(("negative_amount", create.negative_amount))
            .bind(("end_date", create.end_date.to_rfc3339()))
            .await?;
        let created: Option<Product> = res.take(0)?;
        created.ok_or_else(|| {
            self.ctx.to_ctx_error(AppError::SurrealDb {
                source: "create product returned no record".to_string(),
            })
        })
    }

    pub async fn update(&self, product_id: &Thing, patch: ProductPatch) -> CtxResult<Product> {
        let mut sets: Vec<&str> = vec![];
        let mut bindings: Vec<(&str, String)> = vec![];

        if let Some(name) = patch.name {
            sets.push("name = $name");
            bindings.push(("name", name));
        }
        if let Some(image) = patch.image {
            sets.push("image = $image");
            bindings.push(("image", image));
        }
        if let Some(price) = patch.price {
            sets.push("price = <float>$price");
            bindings.push(("price", price.to_string()));
        }
        if let Some(negative_amount) = patch.negative_amount {
            sets.push("negative_amount = <float>$negative_amount");
            bindings.push(("negative_amount", negative_amount.to_string()));
        }
        if let Some(end_date) = patch.end_date {
            sets.push("end_date = <datetime>$end_date");
            bindings.push(("end_date", end_date.to_rfc3339()));
        }
        if let Some(is_active) = patch.is_active {
            sets.push("is_active = <bool>$is_active");
            bindings.push(("is_active", is_active.to_string()));
        }

        if sets.is_empty() {
            return self.get(IdentIdName::Id(product_id.clone())).await;
        }

        let qry = format!("UPDATE $product_id SET {};", sets.join(", "));
        let mut res = bindings
            .into_iter()
            .fold(
                self.db.query(qry).bind(("product_id", product_id.clone())),
                |q, (name, val)| q.bind((name.to_string(), val)),
            )
            .await?;
        let updated: Option<Product> = res.take(0)?;
        with_not_found_err(updated, self.ctx, product_id.to_raw().as_str())
    }

    /// Active, unexpired products, newest first.
    pub async fn get_active(&self) -> CtxResult<Vec<Product>> {
        let qry = format!(
            "SELECT * FROM {TABLE_NAME} WHERE is_active = true AND end_date > time::now() ORDER BY r_created DESC;"
        );
        get_list_qry(self.db, QryBindingsVal::new(qry, HashMap::new())).await
    }

    /// Active products the user has not yet submitted.
    pub async fn get_active_for_user(&self, user_id: &Thing) -> CtxResult<Vec<Product>> {
        let qry = format!(
            "SELECT * FROM {TABLE_NAME}
                WHERE is_active = true
                AND end_date > time::now()
                AND id NOTINSIDE (SELECT VALUE product FROM {SUBMISSION_TABLE} WHERE user = <record>$user_id)
                ORDER BY r_created DESC;"
        );
        let mut bindings = HashMap::new();
        bindings.insert("user_id".to_string(), user_id.to_raw());
        get_list_qry(self.db, QryBindingsVal::new(qry, bindings)).await
    }

    /// Debit overrides of the user keyed by product id.
    pub async fn get_override_amounts(&self, user_id: &Thing) -> CtxResult<HashMap<Thing, f64>> {
        #[derive(Deserialize)]
        struct OverrideAmount {
            product: Thing,
            negative_amount: f64,
        }

        let qry = format!(
            "SELECT product, negative_amount FROM {OVERRIDE_TABLE} WHERE user = <record>$user_id;"
        );
        let mut bindings = HashMap::new();
        bindings.insert("user_id".to_string(), user_id.to_raw());
        let overrides: Vec<OverrideAmount> =
            get_list_qry(self.db, QryBindingsVal::new(qry, bindings)).await?;
        Ok(overrides
            .into_iter()
            .map(|o| (o.product, o.negative_amount))
            .collect())
    }
}
