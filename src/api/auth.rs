use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// Token issuance lives in the platform auth service; this backend only
// verifies what it is handed.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // wallet address
    pub exp: usize,  // expiry
    pub iat: usize,  // issued at
}

pub async fn extract_user_from_token(token: &str, secret: &str) -> Result<String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid or expired token".to_string()))?;

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(sub: &str, secret: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + exp_offset_secs) as usize,
            iat: now as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_subject() {
        let token = make_token("9xQeWvG816bUx9EPjHmaT23yTVqY", "secret", 3600);
        let user = extract_user_from_token(&token, "secret").await.unwrap();
        assert_eq!(user, "9xQeWvG816bUx9EPjHmaT23yTVqY");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let token = make_token("someone", "secret", -3600);
        let result = extract_user_from_token(&token, "secret").await;
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let token = make_token("someone", "secret", 3600);
        let result = extract_user_from_token(&token, "other-secret").await;
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }
}
