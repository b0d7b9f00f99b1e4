use chrono::{DateTime, Utc};
use futures::join;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    database::client::Db,
    entities::product_entity::{Product, ProductCreate, ProductDbService, ProductPatch},
    middleware::{
        ctx::Ctx,
        error::CtxResult,
        utils::string_utils::get_str_thing,
    },
};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 2, message = "Min 2 characters for name"))]
    pub name: String,
    pub image: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(range(min = 0.0))]
    pub negative_amount: f64,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct ProductUpdateInput {
    pub name: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub negative_amount: Option<f64>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

pub struct ProductService<'a> {
    products_repository: ProductDbService<'a>,
}

impl<'a> ProductService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            products_repository: ProductDbService { db, ctx },
        }
    }

    pub async fn create(&self, input: ProductInput) -> CtxResult<Product> {
        input.validate()?;
        self.products_repository
            .create(ProductCreate {
                name: input.name,
                image: input.image,
                price: input.price,
                negative_amount: input.negative_amount,
                end_date: input.end_date,
            })
            .await
    }

    pub async fn update(&self, product_id: &str, input: ProductUpdateInput) -> CtxResult<Product> {
        input.validate()?;
        let product_thing = get_str_thing(product_id)?;
        self.products_repository
            .update(
                &product_thing,
                ProductPatch {
                    name: input.name,
                    image: input.image,
                    price: input.price,
                    negative_amount: input.negative_amount,
                    end_date: input.end_date,
                    is_active: input.is_active,
                },
            )
            .await
    }

    pub async fn get_active(&self) -> CtxResult<Vec<Product>> {
        self.products_repository.get_active().await
    }

    /// Active products the user can still submit, with the user's debit
    /// override projected onto `negative_amount`.
    pub async fn get_active_for_user(&self, user_id: &str) -> CtxResult<Vec<Product>> {
        let user_thing = get_str_thing(user_id)?;

        let (products, overrides) = join!(
            self.products_repository.get_active_for_user(&user_thing),
            self.products_repository.get_override_amounts(&user_thing)
        );
        let (mut products, overrides) = (products?, overrides?);

        for product in products.iter_mut() {
            if let Some(id) = product.id.as_ref() {
                if let Some(amount) = overrides.get(id) {
                    product.negative_amount = *amount;
                }
            }
        }
        Ok(products)
    }
}
