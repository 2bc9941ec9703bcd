//pour les requêtes et réponses structurées
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{order::OrderStatus, pickup_location, product, product_image, users::Role};
use crate::utils::numeric::NumericInput;

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Paramètres de GET /products, tous bruts (parsés strictement par le service)
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<NumericInput>,
    pub condition: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub stock: Option<NumericInput>,
    pub images: Option<Vec<String>>,
}

// Mise à jour partielle: un champ absent n'est pas modifié
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<NumericInput>,
    pub condition: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub stock: Option<NumericInput>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerContact {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub role: Role,
    pub has_completed_onboarding: bool,
    pub created_at: DateTime<Utc>,
}

/// Produit avec ses images ordonnées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithImages {
    #[serde(flatten)]
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
    pub seller: Option<SellerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
    pub seller: Option<SellerContact>,
}

// ---------------------------------------------------------------------------
// Panier
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub user_external_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub user_external_id: Option<String>,
    pub product_id: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub item_id: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartItemRequest {
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: String,
    pub cart_id: String,
    pub product_id: Option<String>,
    pub quantity: i32,
    pub product: Option<ProductWithImages>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemView>,
}

// ---------------------------------------------------------------------------
// Commandes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_external_id: Option<String>,
    pub pickup_location_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub user_external_id: Option<String>,
}

/// Filtres de la recherche admin (ET logique entre les champs renseignés)
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerSummary {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductSummary {
    pub id: String,
    pub name: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: String,
    pub product_id: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    // None = produit supprimé depuis la commande
    pub product: Option<OrderProductSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub pickup_location: Option<pickup_location::Model>,
    // Renseigné uniquement pour les vues admin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<BuyerSummary>,
    pub items: Vec<OrderItemView>,
}

// ---------------------------------------------------------------------------
// Points de retrait
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePickupLocationRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    pub contact: Option<String>,
}

// ---------------------------------------------------------------------------
// Identité / onboarding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub phone: Option<String>,
    pub role: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleQuery {
    pub external_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub role: Role,
    pub has_completed_onboarding: bool,
}
