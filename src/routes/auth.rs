use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{OnboardingRequest, RoleQuery};
use crate::services::identity_service::IdentityService;

/// POST /api/identity/sync - premier retour du fournisseur d'identité (PROTÉGÉE)
#[post("/identity/sync")]
pub async fn sync_identity(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let user = IdentityService::sync_user(
        db.get_ref(),
        &auth_user.external_id,
        auth_user.email.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// POST /api/onboarding - profil + choix du rôle (PROTÉGÉE)
#[post("/onboarding")]
pub async fn onboarding(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<OnboardingRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let user = IdentityService::complete_onboarding(
        db.get_ref(),
        &auth_user.external_id,
        auth_user.email.as_deref(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// GET /api/role?externalId=
#[get("/role")]
pub async fn get_role(
    db: web::Data<DatabaseConnection>,
    query: web::Query<RoleQuery>,
) -> Result<HttpResponse, AppError> {
    let external_id = query
        .external_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("Missing externalId".to_string()))?;

    let role = IdentityService::get_role(db.get_ref(), external_id).await?;

    Ok(HttpResponse::Ok().json(role))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(sync_identity)
        .service(onboarding)
        .service(get_role);
}
