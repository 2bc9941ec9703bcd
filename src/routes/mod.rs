pub mod health;
pub mod auth;
pub mod products;
pub mod cart;
pub mod orders;
pub mod admin;
pub mod pickup;

use actix_web::{web, HttpResponse};

use crate::error::AppError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // corps ou paramètres illisibles -> 400 { error }
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .app_data(query_config)
            .app_data(path_config)
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(products::products_routes)
            .configure(cart::cart_routes)
            .configure(orders::orders_routes)
            .configure(admin::admin_routes)
            .configure(pickup::pickup_routes)
            .default_service(web::to(|| async {
                Err::<HttpResponse, AppError>(AppError::NotFound("Route not found".to_string()))
            })),
    );
}
