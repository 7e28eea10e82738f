use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "relay_admin_session";

#[derive(Debug, Clone)]
pub struct JwtSettings {
    secret: String,
    algorithm: Algorithm,
    expire_minutes: i64,
}

impl JwtSettings {
    /// `JWT_SECRET_KEY` is required; `JWT_ALGORITHM` defaults to HS256,
    /// `JWT_ACCESS_TOKEN_EXPIRE_MINUTES` to 7 days, matching spec.md §6.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET_KEY is required for the admin surface"))?;
        let algorithm = std::env::var("JWT_ALGORITHM")
            .ok()
            .and_then(|v| parse_algorithm(&v))
            .unwrap_or(Algorithm::HS256);
        let expire_minutes = std::env::var("JWT_ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_080);
        Ok(Self {
            secret,
            algorithm,
            expire_minutes,
        })
    }

    pub fn issue(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = relay_common::clock::unix_seconds() + self.expire_minutes * 60;
        let claims = Claims { sub: "admin".into(), exp };
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify(&self, token: &str) -> bool {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(self.algorithm),
        )
        .is_ok()
    }

    /// An attribute-complete `Set-Cookie` value: HttpOnly, SameSite=Strict,
    /// scoped to the admin surface, expiring with the token itself.
    pub fn cookie_header(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            self.expire_minutes * 60
        )
    }
}

fn parse_algorithm(value: &str) -> Option<Algorithm> {
    match value.to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub fn extract_session_cookie(cookie_header: Option<&str>) -> Option<String> {
    let header = cookie_header?;
    header.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
