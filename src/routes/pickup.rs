use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::CreatePickupLocationRequest;
use crate::services::pickup_service::PickupService;

/// GET /api/pickup-locations
#[get("")]
pub async fn list_pickup_locations(
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let locations = PickupService::list(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(locations))
}

/// POST /api/pickup-locations (PROTÉGÉE, sans contrôle de rôle)
#[post("")]
pub async fn create_pickup_location(
    _auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreatePickupLocationRequest>,
) -> Result<HttpResponse, AppError> {
    let location = PickupService::create(db.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(location))
}

pub fn pickup_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pickup-locations")
            .service(list_pickup_locations)
            .service(create_pickup_location),
    );
}
