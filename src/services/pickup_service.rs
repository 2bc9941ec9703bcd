use sea_orm::*;
use chrono::Utc;
use validator::Validate;

use crate::error::AppResult;
use crate::models::dto::CreatePickupLocationRequest;
use crate::models::pickup_location;
use crate::services::new_id;

pub struct PickupService;

impl PickupService {
    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<pickup_location::Model>> {
        Ok(pickup_location::Entity::find()
            .order_by_asc(pickup_location::Column::Name)
            .all(db)
            .await?)
    }

    /// Aucun contrôle de rôle: un appelant authentifié suffit (vérifié par la route)
    pub async fn create(
        db: &DatabaseConnection,
        request: CreatePickupLocationRequest,
    ) -> AppResult<pickup_location::Model> {
        let request = CreatePickupLocationRequest {
            name: request.name.trim().to_string(),
            address: request.address.trim().to_string(),
            city: request.city.trim().to_string(),
            contact: request
                .contact
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        };
        request.validate()?;

        let location = pickup_location::ActiveModel {
            id: Set(new_id()),
            name: Set(request.name),
            address: Set(request.address),
            city: Set(request.city),
            contact: Set(request.contact),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        log::info!("Pickup location {} created ({})", location.id, location.name);
        Ok(location)
    }
}
