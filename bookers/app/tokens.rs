//! Remember-me tokens: a signed JWT bound to the account's
//! `remember_created_at` stamp.

use chrono::Duration;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use jwt::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{self, User};

pub const REMEMBER_FOR_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn encode(secret_key: &str, claims: &Claims) -> Result<String> {
    Ok(jwt::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )?)
}

pub fn decode(secret_key: &str, token: &str) -> Result<Claims> {
    let data = jwt::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret_key.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected remember token");
        Error::InvalidToken
    })?;
    Ok(data.claims)
}

impl User {
    /// Issues a token for the stored `remember_created_at` stamp. The stamp
    /// is renewed when it is missing or older than [`REMEMBER_FOR_DAYS`].
    pub fn remember_me(&self, conn: &mut SqliteConnection, secret_key: &str) -> Result<String> {
        use crate::schema::users::dsl;

        let stored = dsl::users
            .find(self.id)
            .select(dsl::remember_created_at)
            .first::<Option<chrono::NaiveDateTime>>(conn)
            .optional()?
            .ok_or(Error::NotFound("user"))?;
        let now = models::now();
        let stamp = match stored {
            Some(stamp) if now - stamp < Duration::days(REMEMBER_FOR_DAYS) => stamp,
            _ => {
                diesel::update(self)
                    .set(dsl::remember_created_at.eq(now))
                    .execute(conn)?;
                tracing::debug!(user_id = self.id, "renewed remember stamp");
                now
            }
        };
        let iat = stamp.and_utc().timestamp();
        encode(
            secret_key,
            &Claims {
                sub: self.id.to_string(),
                iat,
                exp: iat + Duration::days(REMEMBER_FOR_DAYS).num_seconds(),
            },
        )
    }

    /// Resolves a remember-me token back to its account.
    pub fn recall(conn: &mut SqliteConnection, secret_key: &str, token: &str) -> Result<User> {
        let claims = decode(secret_key, token)?;
        let id = claims.sub.parse::<i32>().map_err(|_| Error::InvalidToken)?;
        let user = User::find(conn, id).map_err(|e| {
            if e.is_not_found() {
                Error::InvalidToken
            } else {
                e
            }
        })?;
        match user.remember_created_at {
            Some(stamp) if stamp.and_utc().timestamp() == claims.iat => Ok(user),
            _ => Err(Error::InvalidToken),
        }
    }

    /// Invalidates every outstanding remember-me token.
    pub fn forget_me(&self, conn: &mut SqliteConnection) -> Result<()> {
        use crate::schema::users::dsl;

        diesel::update(self)
            .set(dsl::remember_created_at.eq(None::<chrono::NaiveDateTime>))
            .execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_wrong_secret() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = encode("secret", &claims).unwrap();
        let decoded = decode("secret", &token).unwrap();
        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.iat, now);
        assert!(matches!(decode("other", &token), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_expired() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode("secret", &claims).unwrap();
        assert!(matches!(decode("secret", &token), Err(Error::InvalidToken)));
    }
}
