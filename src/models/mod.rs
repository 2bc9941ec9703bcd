// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Entités SeaORM (une par table) et DTO de l'API.
//
// Liste des modules:
//   - health : Health check API
//   - dto : requêtes et réponses de l'API
//   - users : Utilisateurs (id externe du fournisseur d'identité + rôle)
//   - product / product_image : Catalogue des pièces et leurs images ordonnées
//   - cart / cart_item : Panier persistant, une ligne par produit
//   - order / order_item : Commandes et prix figés à la commande
//   - pickup_location : Points de retrait
//
// Points d'attention:
//   - Les montants sont des Decimal(12,2), jamais des flottants
//   - cart_items.product_id et order_items.product_id passent à NULL si le produit disparaît
//
// ============================================================================

pub mod health;
pub mod dto;
pub mod users;
pub mod product;
pub mod product_image;
pub mod cart;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod pickup_location;
