use sea_orm::*;
use sea_orm::sea_query::{Expr, Func};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use crate::models::dto::{
    CreateProductRequest, ProductDetail, ProductListing, ProductQuery, ProductWithImages,
    SellerContact, SellerSummary, UpdateProductRequest,
};
use crate::models::{product, product_image, users};
use crate::services::identity_service::IdentityService;
use crate::services::{contains_pattern, new_id};
use crate::utils::numeric::{parse_amount, parse_price, parse_stock};

pub struct CatalogService;

/// Filtres de liste déjà validés
#[derive(Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    pub condition: Option<String>,
}

impl ProductFilter {
    /// Parse strict des paramètres bruts; un paramètre vide est ignoré
    pub fn parse(query: &ProductQuery) -> AppResult<Self> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let min_price = present(&query.min_price)
            .map(|raw| parse_amount("minPrice", raw))
            .transpose()
            .map_err(AppError::Validation)?;
        let max_price = present(&query.max_price)
            .map(|raw| parse_amount("maxPrice", raw))
            .transpose()
            .map_err(AppError::Validation)?;

        Ok(ProductFilter {
            search: present(&query.search).map(str::to_lowercase),
            min_price,
            max_price,
            brand: present(&query.brand).map(str::to_lowercase),
            condition: present(&query.condition).map(str::to_lowercase),
        })
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(search) = &self.search {
            let mut any = Condition::any();
            for column in [
                product::Column::Name,
                product::Column::Description,
                product::Column::Brand,
                product::Column::ModelName,
                product::Column::Category,
            ] {
                any = any.add(lower(column).like(contains_pattern(search)));
            }
            cond = cond.add(any);
        }
        if let Some(min) = self.min_price {
            cond = cond.add(product::Column::Price.gte(min));
        }
        if let Some(max) = self.max_price {
            cond = cond.add(product::Column::Price.lte(max));
        }
        if let Some(brand) = &self.brand {
            cond = cond.add(lower(product::Column::Brand).eq(brand.clone()));
        }
        if let Some(condition) = &self.condition {
            cond = cond.add(lower(product::Column::Condition).eq(condition.clone()));
        }

        cond
    }
}

// LOWER(products.<col>)
fn lower(column: product::Column) -> Expr {
    Expr::expr(Func::lower(Expr::col((product::Entity, column))))
}

fn required_text(value: Option<String>, field: &str) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::MissingInput(format!("{} is required", field))),
    }
}

fn non_empty(value: String, field: &str) -> AppResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value)
}

fn image_rows(product_id: &str, urls: Vec<String>) -> Vec<product_image::ActiveModel> {
    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .enumerate()
        .map(|(position, url)| product_image::ActiveModel {
            id: Set(new_id()),
            product_id: Set(product_id.to_string()),
            image_url: Set(url),
            position: Set(position as i32),
        })
        .collect()
}

/// Charge les images de chaque produit (une requête), triées par position
pub(crate) async fn with_images<C: ConnectionTrait>(
    db: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductWithImages>, DbErr> {
    let images = products.load_many(product_image::Entity, db).await?;

    Ok(products
        .into_iter()
        .zip(images)
        .map(|(product, mut images)| {
            images.sort_by_key(|image| image.position);
            ProductWithImages { product, images }
        })
        .collect())
}

impl CatalogService {
    /// Liste filtrée, plus récents d'abord, avec images et nom du vendeur
    pub async fn list(
        db: &DatabaseConnection,
        filter: &ProductFilter,
    ) -> AppResult<Vec<ProductListing>> {
        let products = product::Entity::find()
            .filter(filter.condition())
            .order_by_desc(product::Column::CreatedAt)
            .all(db)
            .await?;

        let sellers = products.load_one(users::Entity, db).await?;
        let products = with_images(db, products).await?;

        Ok(products
            .into_iter()
            .zip(sellers)
            .map(|(p, seller)| ProductListing {
                product: p.product,
                images: p.images,
                seller: seller.map(|s| SellerSummary {
                    display_name: s.display_name(),
                    id: s.id,
                }),
            })
            .collect())
    }

    /// Fiche produit avec les coordonnées complètes du vendeur
    pub async fn get(db: &DatabaseConnection, product_id: &str) -> AppResult<ProductDetail> {
        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let seller = users::Entity::find_by_id(product.seller_id.clone())
            .one(db)
            .await?;

        let mut loaded = with_images(db, vec![product]).await?;
        let ProductWithImages { product, images } = loaded
            .pop()
            .ok_or_else(|| AppError::Internal("Product vanished while loading".to_string()))?;

        Ok(ProductDetail {
            product,
            images,
            seller: seller.map(|s| SellerContact {
                id: s.id,
                first_name: s.first_name,
                last_name: s.last_name,
                email: s.email,
                phone: s.phone,
                image_url: s.image_url,
                role: s.role,
                has_completed_onboarding: s.has_completed_onboarding,
                created_at: s.created_at,
            }),
        })
    }

    /// Produits du vendeur appelant
    pub async fn list_mine(
        db: &DatabaseConnection,
        seller_external_id: &str,
    ) -> AppResult<Vec<ProductWithImages>> {
        let seller = IdentityService::resolve(db, seller_external_id).await?;

        let products = product::Entity::find()
            .filter(product::Column::SellerId.eq(seller.id))
            .order_by_desc(product::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(with_images(db, products).await?)
    }

    pub async fn create(
        db: &DatabaseConnection,
        seller_external_id: &str,
        request: CreateProductRequest,
    ) -> AppResult<ProductWithImages> {
        let seller = IdentityService::resolve(db, seller_external_id).await?;

        // 1. Validation stricte avant toute écriture
        let name = required_text(request.name, "name")?;
        let condition = required_text(request.condition, "condition")?;
        let price = request
            .price
            .as_ref()
            .ok_or_else(|| AppError::MissingInput("price is required".to_string()))
            .and_then(|p| parse_price(p).map_err(AppError::Validation))?;
        let stock = request
            .stock
            .as_ref()
            .map(parse_stock)
            .transpose()
            .map_err(AppError::Validation)?
            .unwrap_or(0);

        // 2. Produit + images dans la même transaction
        let now = Utc::now();
        let product_id = new_id();
        let txn = db.begin().await?;

        let product = product::ActiveModel {
            id: Set(product_id.clone()),
            seller_id: Set(seller.id),
            name: Set(name),
            description: Set(request.description),
            price: Set(price),
            condition: Set(condition),
            category: Set(request.category),
            brand: Set(request.brand),
            model_name: Set(request.model),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let images = image_rows(&product_id, request.images.unwrap_or_default());
        if !images.is_empty() {
            product_image::Entity::insert_many(images)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        log::info!("Product {} created by seller {}", product.id, product.seller_id);

        let mut loaded = with_images(db, vec![product]).await?;
        loaded
            .pop()
            .ok_or_else(|| AppError::Internal("Product vanished while loading".to_string()))
    }

    /// Mise à jour partielle, réservée au vendeur propriétaire
    pub async fn update(
        db: &DatabaseConnection,
        seller_external_id: &str,
        product_id: &str,
        request: UpdateProductRequest,
    ) -> AppResult<ProductWithImages> {
        let seller = IdentityService::resolve(db, seller_external_id).await?;

        let mut changes = product::ActiveModel {
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(name) = request.name {
            changes.name = Set(non_empty(name, "name")?);
        }
        if let Some(condition) = request.condition {
            changes.condition = Set(non_empty(condition, "condition")?);
        }
        if let Some(price) = request.price.as_ref() {
            changes.price = Set(parse_price(price).map_err(AppError::Validation)?);
        }
        if let Some(stock) = request.stock.as_ref() {
            changes.stock = Set(parse_stock(stock).map_err(AppError::Validation)?);
        }
        if let Some(description) = request.description {
            changes.description = Set(Some(description));
        }
        if let Some(category) = request.category {
            changes.category = Set(Some(category));
        }
        if let Some(brand) = request.brand {
            changes.brand = Set(Some(brand));
        }
        if let Some(model) = request.model {
            changes.model_name = Set(Some(model));
        }

        let txn = db.begin().await?;

        // Contrôle de propriété et écriture en une seule requête
        let result = product::Entity::update_many()
            .set(changes)
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::SellerId.eq(seller.id.as_str()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            let exists = product::Entity::find_by_id(product_id).one(&txn).await?.is_some();
            return Err(if exists {
                AppError::Forbidden("You do not own this product".to_string())
            } else {
                AppError::not_found("Product")
            });
        }

        // Remplacement destructif des images
        if let Some(urls) = request.images {
            product_image::Entity::delete_many()
                .filter(product_image::Column::ProductId.eq(product_id))
                .exec(&txn)
                .await?;

            let images = image_rows(product_id, urls);
            if !images.is_empty() {
                product_image::Entity::insert_many(images)
                    .exec_without_returning(&txn)
                    .await?;
            }
        }

        txn.commit().await?;

        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let mut loaded = with_images(db, vec![product]).await?;
        loaded
            .pop()
            .ok_or_else(|| AppError::Internal("Product vanished while loading".to_string()))
    }
}
