use actix_web::{delete, get, patch, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{AddToCartRequest, CartQuery, RemoveCartItemRequest, UpdateCartItemRequest};
use crate::services::cart_service::CartService;

/// GET /api/cart?userExternalId=
#[get("")]
pub async fn get_cart(
    db: web::Data<DatabaseConnection>,
    query: web::Query<CartQuery>,
) -> Result<HttpResponse, AppError> {
    let user_external_id = query
        .user_external_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("Missing user ID".to_string()))?;

    let cart = CartService::get_cart(db.get_ref(), user_external_id).await?;

    Ok(HttpResponse::Ok().json(cart))
}

/// POST /api/cart - ajoute ou incrémente une ligne
#[post("")]
pub async fn add_to_cart(
    db: web::Data<DatabaseConnection>,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
    CartService::add_item(db.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// PATCH /api/cart/item - écrase la quantité
#[patch("/item")]
pub async fn update_cart_item(
    db: web::Data<DatabaseConnection>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item = CartService::update_quantity(db.get_ref(), &body.item_id, body.quantity).await?;

    Ok(HttpResponse::Ok().json(item))
}

/// DELETE /api/cart/item
#[delete("/item")]
pub async fn remove_cart_item(
    db: web::Data<DatabaseConnection>,
    body: web::Json<RemoveCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    CartService::remove_item(db.get_ref(), &body.item_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

pub fn cart_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .service(get_cart)
            .service(add_to_cart)
            .service(update_cart_item)
            .service(remove_cart_item),
    );
}
