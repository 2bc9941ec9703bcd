use actix_web::{get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CreateProductRequest, ProductQuery, UpdateProductRequest};
use crate::services::catalog_service::{CatalogService, ProductFilter};

/// GET /api/products?search=&minPrice=&maxPrice=&brand=&condition=
#[get("")]
pub async fn list_products(
    db: web::Data<DatabaseConnection>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = ProductFilter::parse(&query)?;
    let products = CatalogService::list(db.get_ref(), &filter).await?;

    Ok(HttpResponse::Ok().json(products))
}

/// GET /api/products/{id}
#[get("/{id}")]
pub async fn get_product(
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let product = CatalogService::get(db.get_ref(), &path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(product))
}

/// POST /api/products (PROTÉGÉE)
#[post("")]
pub async fn create_product(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product =
        CatalogService::create(db.get_ref(), &auth_user.external_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(product))
}

/// PUT /api/products/{id} - réservé au vendeur propriétaire (PROTÉGÉE)
#[put("/{id}")]
pub async fn update_product(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product = CatalogService::update(
        db.get_ref(),
        &auth_user.external_id,
        &path.into_inner(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(product))
}

/// GET /api/my-products - produits du vendeur connecté (PROTÉGÉE)
#[get("/my-products")]
pub async fn my_products(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let products = CatalogService::list_mine(db.get_ref(), &auth_user.external_id).await?;

    Ok(HttpResponse::Ok().json(products))
}

pub fn products_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(my_products).service(
        web::scope("/products")
            .service(list_products)
            .service(get_product)
            .service(create_product)
            .service(update_product),
    );
}
