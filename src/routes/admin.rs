use actix_web::{get, patch, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{AdminOrderQuery, UpdateOrderStatusRequest};
use crate::services::order_service::OrderService;

/// GET /api/admin/orders?pickupLocationId=&orderId=&email= (ADMIN)
#[get("")]
pub async fn search_orders(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<AdminOrderQuery>,
) -> Result<HttpResponse, AppError> {
    let orders = OrderService::admin_search(db.get_ref(), &auth_user.external_id, &query).await?;

    Ok(HttpResponse::Ok().json(orders))
}

/// PATCH /api/admin/orders/{id} - { status } (ADMIN)
#[patch("/{id}")]
pub async fn update_order_status(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order = OrderService::update_status(
        db.get_ref(),
        &auth_user.external_id,
        &path.into_inner(),
        &body.status,
    )
    .await?;

    Ok(HttpResponse::Ok().json(order))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/orders")
            .service(search_orders)
            .service(update_order_status),
    );
}
