use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

/// Jeton émis par le fournisseur d'identité
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // id externe de l'utilisateur
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,              // expiration timestamp
}

/// Génère un jeton d'identité (outil de dev: sous-commande `issue-token`)
pub fn generate_token(
    external_id: &str,
    email: Option<&str>,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: external_id.to_string(),
        email: email.map(str::to_string),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Vérifie et décode un jeton d'identité
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_generate_and_verify_token() {
        let token = generate_token("user_2abc", Some("jane@example.com"), SECRET, 1).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, "user_2abc");
        assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid.token.here", SECRET);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_token("user_2abc", None, SECRET, 1).unwrap();
        assert!(verify_token(&token, "another-secret").is_err());
    }

    #[test]
    fn test_expired_token() {
        // au-delà de la marge par défaut (60s) de jsonwebtoken
        let token = generate_token("user_2abc", None, SECRET, -2).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }
}
