use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{OrderQuery, PlaceOrderRequest};
use crate::services::notifier::OrderNotifier;
use crate::services::order_service::OrderService;

/// GET /api/order?userExternalId= - historique de l'acheteur
#[get("")]
pub async fn list_orders(
    db: web::Data<DatabaseConnection>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, AppError> {
    let user_external_id = query
        .user_external_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("Missing user ID".to_string()))?;

    let orders = OrderService::list_buyer_orders(db.get_ref(), user_external_id).await?;

    Ok(HttpResponse::Ok().json(orders))
}

/// POST /api/order - transforme le panier en commande
#[post("")]
pub async fn place_order(
    db: web::Data<DatabaseConnection>,
    notifier: web::Data<dyn OrderNotifier>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order = OrderService::place_order(db.get_ref(), notifier.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(order))
}

pub fn orders_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/order")
            .service(list_orders)
            .service(place_order),
    );
}
