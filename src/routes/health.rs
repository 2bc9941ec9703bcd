use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::models::health::HealthResponse;

/// GET /api/health - 503 si la base est injoignable
#[get("/health")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> HttpResponse {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse::ok()),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse::degraded())
        }
    }
}
