use sea_orm::*;
use sea_orm::sea_query::{Expr, OnConflict};
use chrono::Utc;
use std::collections::HashMap;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::dto::{AddToCartRequest, CartItemView, CartResponse};
use crate::models::{cart, cart_item, product};
use crate::services::catalog_service::with_images;
use crate::services::identity_service::IdentityService;
use crate::services::new_id;

pub struct CartService;

impl CartService {
    /// Panier courant; un utilisateur sans panier a simplement une liste vide
    pub async fn get_cart(db: &DatabaseConnection, user_external_id: &str) -> AppResult<CartResponse> {
        let user = IdentityService::resolve(db, user_external_id).await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user.id))
            .one(db)
            .await?;

        let Some(cart) = cart else {
            return Ok(CartResponse { items: Vec::new() });
        };

        let items = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(db)
            .await?;

        let product_ids: Vec<String> = items.iter().filter_map(|i| i.product_id.clone()).collect();
        let products = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?;

        let mut by_id: HashMap<String, _> = with_images(db, products)
            .await?
            .into_iter()
            .map(|p| (p.product.id.clone(), p))
            .collect();

        let items = items
            .into_iter()
            .map(|item| CartItemView {
                product: item.product_id.as_ref().and_then(|id| by_id.remove(id)),
                id: item.id,
                cart_id: item.cart_id,
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();

        Ok(CartResponse { items })
    }

    /// Trouve ou crée le panier: INSERT ... ON CONFLICT (user_id) DO NOTHING puis lecture
    async fn find_or_create_cart(db: &DatabaseConnection, user_id: &str) -> AppResult<cart::Model> {
        let new_cart = cart::ActiveModel {
            id: Set(new_id()),
            user_id: Set(user_id.to_string()),
            created_at: Set(Utc::now()),
        };

        cart::Entity::insert(new_cart)
            .on_conflict(OnConflict::column(cart::Column::UserId).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;

        cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::Internal("Cart missing right after upsert".to_string()))
    }

    /// Ajout au panier: un seul upsert atomique sur (cart_id, product_id)
    pub async fn add_item(db: &DatabaseConnection, request: AddToCartRequest) -> AppResult<()> {
        let (Some(user_external_id), Some(product_id), Some(quantity)) = (
            request.user_external_id.as_deref().filter(|s| !s.trim().is_empty()),
            request.product_id.as_deref().filter(|s| !s.trim().is_empty()),
            request.quantity,
        ) else {
            return Err(AppError::MissingInput("Missing data".to_string()));
        };
        request.validate()?;

        let user = IdentityService::resolve(db, user_external_id).await?;

        product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let cart = Self::find_or_create_cart(db, &user.id).await?;

        let item = cart_item::ActiveModel {
            id: Set(new_id()),
            cart_id: Set(cart.id),
            product_id: Set(Some(product_id.to_string())),
            quantity: Set(quantity),
        };

        // ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + n
        cart_item::Entity::insert(item)
            .on_conflict(
                OnConflict::columns([cart_item::Column::CartId, cart_item::Column::ProductId])
                    .value(
                        cart_item::Column::Quantity,
                        Expr::col((cart_item::Entity, cart_item::Column::Quantity)).add(quantity),
                    )
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    /// Écrase la quantité (>= 1)
    pub async fn update_quantity(
        db: &DatabaseConnection,
        item_id: &str,
        quantity: i32,
    ) -> AppResult<cart_item::Model> {
        if quantity < 1 {
            return Err(AppError::Validation("Quantity must be at least 1".to_string()));
        }

        let item = cart_item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Cart item"))?;

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(quantity);

        Ok(active.update(db).await?)
    }

    /// Suppression idempotente
    pub async fn remove_item(db: &DatabaseConnection, item_id: &str) -> AppResult<()> {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .exec(db)
            .await?;

        Ok(())
    }
}
