use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::utils::jwt;

/// Secret partagé avec le fournisseur d'identité (HS256)
#[derive(Clone)]
pub struct IdentityConfig {
    pub secret: String,
}

/// Appelant authentifié, identifié par son id externe.
/// Utilisé comme extracteur dans les routes protégées.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub external_id: String,
    pub email: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let config = req
        .app_data::<web::Data<IdentityConfig>>()
        .ok_or_else(|| AppError::Internal("Identity provider not configured".to_string()))?;

    // 1. Extraire le header Authorization
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Invalid Authorization header".to_string()))?;

    // 2. Format: "Bearer <token>"
    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthenticated(
            "Invalid Authorization format (expected: Bearer <token>)".to_string(),
        )
    })?;

    // 3. Vérifier le jeton
    let claims = jwt::verify_token(token.trim(), &config.secret)
        .map_err(AppError::Unauthenticated)?;

    if claims.sub.trim().is_empty() {
        return Err(AppError::Unauthenticated("Token has no subject".to_string()));
    }

    Ok(AuthUser {
        external_id: claims.sub,
        email: claims.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const SECRET: &str = "auth-test-secret";

    fn request_with(header: Option<&str>) -> HttpRequest {
        let mut builder = TestRequest::default()
            .app_data(web::Data::new(IdentityConfig { secret: SECRET.to_string() }));
        if let Some(value) = header {
            builder = builder.insert_header(("Authorization", value));
        }
        builder.to_http_request()
    }

    #[test]
    fn test_valid_bearer_token() {
        let token = jwt::generate_token("user_42", Some("a@b.co"), SECRET, 1).unwrap();
        let req = request_with(Some(&format!("Bearer {}", token)));

        let user = authenticate(&req).unwrap();
        assert_eq!(user.external_id, "user_42");
        assert_eq!(user.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        let req = request_with(None);
        assert!(matches!(authenticate(&req), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_wrong_scheme_is_unauthenticated() {
        let req = request_with(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(authenticate(&req), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_forged_token_is_unauthenticated() {
        let token = jwt::generate_token("user_42", None, "not-the-secret", 1).unwrap();
        let req = request_with(Some(&format!("Bearer {}", token)));
        assert!(matches!(authenticate(&req), Err(AppError::Unauthenticated(_))));
    }
}
