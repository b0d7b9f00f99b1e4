use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    Login,
    Admin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub auth: String,
    pub exp: usize,
    pub iat: usize,
    pub r#type: TokenType,
}

pub struct JWT {
    key_enc: EncodingKey,
    key_dec: DecodingKey,
    duration: TimeDelta,
}

impl JWT {
    pub fn new(secret: String, duration: TimeDelta) -> Self {
        Self {
            duration,
            key_enc: EncodingKey::from_secret(secret.as_ref()),
            key_dec: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    pub fn create_by_login(&self, user_id: &str) -> Result<String, String> {
        self.create(user_id, TokenType::Login)
    }

    pub fn create_by_admin(&self, admin_id: &str) -> Result<String, String> {
        self.create(admin_id, TokenType::Admin)
    }

    fn create(&self, ident: &str, r#type: TokenType) -> Result<String, String> {
        let claims = Claims {
            sub: ident.to_string(),
            auth: ident.to_string(),
            exp: (Utc::now() + self.duration).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
            r#type,
        };

        encode(&Header::default(), &claims, &self.key_enc).map_err(|err| err.to_string())
    }

    pub fn decode_by_type(&self, token: &str, r#type: TokenType) -> Result<Claims, String> {
        let token_message =
            decode::<Claims>(token, &self.key_dec, &Validation::new(Algorithm::HS256));

        let data = match token_message {
            Ok(data) => data.claims,
            Err(err) => return Err(err.to_string()),
        };

        if data.r#type == r#type {
            Ok(data)
        } else {
            Err("Token type is not equal".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn login_token_roundtrip() {
        let jwt = JWT::new("some-secret".to_string(), Duration::minutes(5));
        let token = jwt.create_by_login("platform_user:abc").unwrap();
        let claims = jwt.decode_by_type(&token, TokenType::Login).unwrap();
        assert_eq!(claims.auth, "platform_user:abc");
    }

    #[test]
    fn admin_token_rejected_as_login() {
        let jwt = JWT::new("some-secret".to_string(), Duration::minutes(5));
        let token = jwt.create_by_admin("admin:abc").unwrap();
        assert!(jwt.decode_by_type(&token, TokenType::Login).is_err());
        assert!(jwt.decode_by_type(&token, TokenType::Admin).is_ok());
    }

    #[test]
    fn foreign_secret_rejected() {
        let jwt = JWT::new("some-secret".to_string(), Duration::minutes(5));
        let other = JWT::new("other-secret".to_string(), Duration::minutes(5));
        let token = jwt.create_by_login("platform_user:abc").unwrap();
        assert!(other.decode_by_type(&token, TokenType::Login).is_err());
    }
}
