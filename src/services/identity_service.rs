use sea_orm::*;
use sea_orm::sea_query::OnConflict;
use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::models::dto::{OnboardingRequest, RoleResponse};
use crate::models::users::{self, Role};
use crate::services::new_id;

/// Adaptateur du fournisseur d'identité: id externe -> utilisateur interne
pub struct IdentityService;

impl IdentityService {
    pub async fn find_by_external_id(
        db: &DatabaseConnection,
        external_id: &str,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::ExternalId.eq(external_id))
            .one(db)
            .await
    }

    /// Résout l'utilisateur ou renvoie 404
    pub async fn resolve(db: &DatabaseConnection, external_id: &str) -> AppResult<users::Model> {
        if external_id.trim().is_empty() {
            return Err(AppError::MissingInput("Missing user ID".to_string()));
        }

        Self::find_by_external_id(db, external_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Exige un rôle précis: 401 si l'utilisateur est inconnu, 403 si le rôle ne correspond pas
    pub async fn require_role(
        db: &DatabaseConnection,
        external_id: &str,
        role: Role,
    ) -> AppResult<users::Model> {
        let user = Self::find_by_external_id(db, external_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Unknown user".to_string()))?;

        if user.role != role {
            return Err(AppError::Forbidden(format!("{} role required", role.as_str())));
        }

        Ok(user)
    }

    /// Premier retour du fournisseur d'identité: crée la ligne si besoin (idempotent)
    pub async fn sync_user(
        db: &DatabaseConnection,
        external_id: &str,
        email: Option<&str>,
    ) -> AppResult<users::Model> {
        if external_id.trim().is_empty() {
            return Err(AppError::MissingInput("Missing user ID".to_string()));
        }

        let new_user = users::ActiveModel {
            id: Set(new_id()),
            external_id: Set(external_id.to_string()),
            email: Set(email.map(str::to_string)),
            role: Set(Role::Buyer),
            has_completed_onboarding: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        // INSERT ... ON CONFLICT (external_id) DO NOTHING
        users::Entity::insert(new_user)
            .on_conflict(
                OnConflict::column(users::Column::ExternalId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let user = Self::resolve(db, external_id).await?;

        // Email connu du fournisseur mais absent en base: on le complète
        match (email, &user.email) {
            (Some(email), None) => {
                let mut active: users::ActiveModel = user.into();
                active.email = Set(Some(email.to_string()));
                Ok(active.update(db).await?)
            }
            _ => Ok(user),
        }
    }

    /// Onboarding: profil + rôle (BUYER ou SELLER), le rôle ne change plus ensuite
    pub async fn complete_onboarding(
        db: &DatabaseConnection,
        external_id: &str,
        token_email: Option<&str>,
        request: OnboardingRequest,
    ) -> AppResult<users::Model> {
        let role = match Role::parse(&request.role) {
            Some(Role::Admin) | None => {
                return Err(AppError::Validation("Role must be BUYER or SELLER".to_string()));
            }
            Some(role) => role,
        };

        let email = request.email.as_deref().or(token_email);
        let user = Self::sync_user(db, external_id, email).await?;

        if user.has_completed_onboarding && user.role != role {
            return Err(AppError::Validation(
                "Role is fixed once onboarding is complete".to_string(),
            ));
        }

        let mut active: users::ActiveModel = user.into();
        active.first_name = Set(Some(request.first_name.trim().to_string()));
        active.last_name = Set(Some(request.last_name.trim().to_string()));
        active.phone = Set(request.phone.filter(|p| !p.trim().is_empty()));
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        active.role = Set(role);
        active.has_completed_onboarding = Set(true);

        let user = active.update(db).await?;
        log::info!("User {} completed onboarding as {:?}", user.id, user.role);

        Ok(user)
    }

    pub async fn get_role(db: &DatabaseConnection, external_id: &str) -> AppResult<RoleResponse> {
        let user = Self::resolve(db, external_id).await?;

        Ok(RoleResponse {
            role: user.role,
            has_completed_onboarding: user.has_completed_onboarding,
        })
    }

    /// Changement de rôle hors bande (sous-commande `set-role`)
    pub async fn set_role(
        db: &DatabaseConnection,
        external_id: &str,
        role: Role,
    ) -> AppResult<users::Model> {
        let user = Self::sync_user(db, external_id, None).await?;

        let mut active: users::ActiveModel = user.into();
        active.role = Set(role);

        Ok(active.update(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{setup_db, create_user};

    fn onboarding(role: &str) -> OnboardingRequest {
        OnboardingRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone: Some("+254700000000".to_string()),
            role: role.to_string(),
            email: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_sync_user_is_idempotent() {
        let db = setup_db().await;

        let first = IdentityService::sync_user(&db, "ext_1", Some("jane@example.com")).await.unwrap();
        let second = IdentityService::sync_user(&db, "ext_1", None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email.as_deref(), Some("jane@example.com"));
        assert_eq!(second.role, Role::Buyer);
        assert!(!second.has_completed_onboarding);

        let count = users::Entity::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_user() {
        let db = setup_db().await;
        let result = IdentityService::resolve(&db, "nobody").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_onboarding_sets_profile_and_role() {
        let db = setup_db().await;

        let user = IdentityService::complete_onboarding(&db, "ext_2", Some("s@example.com"), onboarding("seller"))
            .await
            .unwrap();

        assert_eq!(user.role, Role::Seller);
        assert!(user.has_completed_onboarding);
        assert_eq!(user.display_name(), "Jane Doe");
        assert_eq!(user.email.as_deref(), Some("s@example.com"));
    }

    #[tokio::test]
    async fn test_onboarding_role_is_fixed() {
        let db = setup_db().await;

        IdentityService::complete_onboarding(&db, "ext_3", None, onboarding("BUYER")).await.unwrap();
        let again = IdentityService::complete_onboarding(&db, "ext_3", None, onboarding("SELLER")).await;

        assert!(matches!(again, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_onboarding_cannot_self_promote_to_admin() {
        let db = setup_db().await;
        let result = IdentityService::complete_onboarding(&db, "ext_4", None, onboarding("ADMIN")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_require_role() {
        let db = setup_db().await;
        create_user(&db, "admin_1", Role::Admin, Some("admin@example.com")).await;
        create_user(&db, "buyer_1", Role::Buyer, Some("buyer@example.com")).await;

        assert!(IdentityService::require_role(&db, "admin_1", Role::Admin).await.is_ok());
        assert!(matches!(
            IdentityService::require_role(&db, "buyer_1", Role::Admin).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            IdentityService::require_role(&db, "ghost", Role::Admin).await,
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_set_role_promotes_existing_user() {
        let db = setup_db().await;
        create_user(&db, "ops_1", Role::Buyer, None).await;

        let user = IdentityService::set_role(&db, "ops_1", Role::Admin).await.unwrap();
        assert_eq!(user.role, Role::Admin);
    }
}
