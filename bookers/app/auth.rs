//! Credential storage: bcrypt password digests, random tokens and the
//! password-reset flow.

use std::sync::atomic::{AtomicU32, Ordering};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rand::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result, ValidationErrors};
use crate::models::{self, User};
use crate::validation;

static BCRYPT_COST: AtomicU32 = AtomicU32::new(bcrypt::DEFAULT_COST);

/// How long a password-reset token stays usable, in hours.
pub const RESET_PASSWORD_WITHIN_HOURS: i64 = 6;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Overrides the bcrypt work factor for every later hash. Values below
/// [`MIN_COST`] are raised to it.
pub fn set_cost(cost: u32) {
    BCRYPT_COST.store(cost.max(MIN_COST), Ordering::Relaxed);
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST.load(Ordering::Relaxed))?)
}

/// A malformed digest counts as a mismatch.
pub fn verify_password(password: &str, digest: &str) -> bool {
    bcrypt::verify(password, digest).unwrap_or(false)
}

/// URL-safe random token built from `len` random bytes.
pub fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut buf = vec![0; len];
    rng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(&buf)
}

/// Only digests of reset tokens are stored.
pub(crate) fn token_digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

impl User {
    pub fn authenticate(conn: &mut SqliteConnection, email: &str, password: &str) -> Result<User> {
        use crate::schema::users::dsl;

        let found = dsl::users
            .filter(dsl::email.eq(validation::normalize_email(email)))
            .select(User::as_select())
            .first(conn)
            .optional()?;
        match found {
            Some(user) if verify_password(password, &user.encrypted_password) => {
                tracing::debug!(user_id = user.id, "authenticated");
                Ok(user)
            }
            _ => {
                tracing::warn!(%email, "rejected credentials");
                Err(Error::InvalidCredentials)
            }
        }
    }

    pub fn valid_password(&self, password: &str) -> bool {
        verify_password(password, &self.encrypted_password)
    }

    /// Stores a fresh reset token for the account behind `email` and returns
    /// the raw token for delivery.
    pub fn send_reset_password_instructions(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<String> {
        use crate::schema::users::dsl;

        let user = dsl::users
            .filter(dsl::email.eq(validation::normalize_email(email)))
            .select(User::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::NotFound("user"))?;
        let token = random_token(20);
        let now = models::now();
        diesel::update(&user)
            .set((
                dsl::reset_password_token.eq(token_digest(&token)),
                dsl::reset_password_sent_at.eq(now),
                dsl::updated_at.eq(now),
            ))
            .execute(conn)?;
        tracing::info!(user_id = user.id, "issued reset password token");
        Ok(token)
    }

    pub fn reset_password_by_token(
        conn: &mut SqliteConnection,
        token: &str,
        new_password: &str,
    ) -> Result<User> {
        use crate::schema::users::dsl;

        let user = dsl::users
            .filter(dsl::reset_password_token.eq(token_digest(token)))
            .select(User::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::InvalidToken)?;
        let now = models::now();
        match user.reset_password_sent_at {
            Some(sent_at) if now - sent_at <= Duration::hours(RESET_PASSWORD_WITHIN_HOURS) => {}
            _ => return Err(Error::InvalidToken),
        }

        let mut errors = ValidationErrors::new();
        validation::password(&mut errors, new_password);
        errors.into_result()?;

        let digest = hash_password(new_password)?;
        let user = diesel::update(&user)
            .set((
                dsl::encrypted_password.eq(digest),
                dsl::reset_password_token.eq(None::<String>),
                dsl::reset_password_sent_at.eq(None::<chrono::NaiveDateTime>),
                dsl::updated_at.eq(now),
            ))
            .returning(User::as_returning())
            .get_result(conn)?;
        tracing::info!(user_id = user.id, "password reset");
        Ok(user)
    }
}
