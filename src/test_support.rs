// Fixtures partagées par les tests de services et de routes
use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use crate::migration::Migrator;
use crate::models::{pickup_location, product, users, users::Role};
use crate::services::new_id;

/// Base SQLite en mémoire, migrée avec le même migrateur que la prod
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("sqlite in-memory connection");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

pub async fn create_user(
    db: &DatabaseConnection,
    external_id: &str,
    role: Role,
    email: Option<&str>,
) -> users::Model {
    users::ActiveModel {
        id: Set(new_id()),
        external_id: Set(external_id.to_string()),
        first_name: Set(Some("Test".to_string())),
        last_name: Set(Some(external_id.to_string())),
        email: Set(email.map(str::to_string)),
        phone: Set(None),
        role: Set(role),
        image_url: Set(None),
        has_completed_onboarding: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn create_pickup(db: &DatabaseConnection, name: &str) -> pickup_location::Model {
    pickup_location::ActiveModel {
        id: Set(new_id()),
        name: Set(name.to_string()),
        address: Set("1 Main Street".to_string()),
        city: Set("Nairobi".to_string()),
        contact: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("insert pickup location")
}

// SQLite range un décimal sans partie fractionnaire en INTEGER et sea-orm le relit en f64:
// les tests utilisent des prix fractionnaires exacts en binaire (.25, .5, .75)
pub async fn create_product(
    db: &DatabaseConnection,
    seller_id: &str,
    name: &str,
    price: &str,
) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(new_id()),
        seller_id: Set(seller_id.to_string()),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(Decimal::from_str(price).expect("decimal literal")),
        condition: Set("new".to_string()),
        category: Set(None),
        brand: Set(None),
        model_name: Set(None),
        stock: Set(10),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert product")
}
