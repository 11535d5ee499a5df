use crate::error::AppResult;
use crate::models::{Role, Session};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // customer code id, or "admin"
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in,
        }
    }

    pub fn generate_token(&self, session: &Session) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in);

        let sub = match session.customer_id() {
            Some(id) => id.to_string(),
            None => "admin".to_string(),
        };
        let claims = Claims {
            sub,
            role: session.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }

    pub fn get_expires_in(&self) -> i64 {
        self.expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomerCode;

    #[test]
    fn test_customer_token_carries_code_id() {
        let jwt = JwtService::new("secret", 3600);
        let session = Session::customer(CustomerCode::pending(
            "C-1".into(),
            "Sara".into(),
            None,
        ));
        let claims = jwt.verify_token(&jwt.generate_token(&session).unwrap()).unwrap();
        assert_eq!(claims.sub, "C-1");
        assert_eq!(claims.role, Role::Customer);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_admin_token() {
        let jwt = JwtService::new("secret", 3600);
        let claims = jwt
            .verify_token(&jwt.generate_token(&Session::admin()).unwrap())
            .unwrap();
        assert!(claims.is_admin());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = JwtService::new("one", 3600);
        let verifier = JwtService::new("two", 3600);
        let token = issuer.generate_token(&Session::admin()).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }
}
