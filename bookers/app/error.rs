use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("token is invalid or has expired")]
    InvalidToken,

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("token encoding error: {0}")]
    Jwt(#[from] jwt::errors::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Database(diesel::result::Error::NotFound)
        )
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Error::Validation(e)
    }
}

/// Per-field validation messages, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(|v| &v[..]).unwrap_or(&[])
    }

    /// `Ok(())` when no message was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{} {}", field, message)?;
            }
        }
        Ok(())
    }
}

/// Maps a unique-index violation to the usual "taken" message. The field is
/// the first of `fields` named in the database message, else the first one.
pub(crate) fn taken_on_conflict(e: diesel::result::Error, fields: &[&'static str]) -> Error {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let message = info.message();
            let field = fields
                .iter()
                .copied()
                .find(|field| message.contains(&format!(".{}", field)))
                .or_else(|| fields.first().copied())
                .unwrap_or("base");
            Error::Validation(ValidationErrors::single(field, "has already been taken"))
        }
        e => Error::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is too short (minimum is 2 characters)");
        errors.add("introduction", "is too long (maximum is 50 characters)");
        assert_eq!(
            errors.to_string(),
            "introduction is too long (maximum is 50 characters), \
             name is too short (minimum is 2 characters)"
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let err = ValidationErrors::single("name", "can't be blank")
            .into_result()
            .unwrap_err();
        let fields = err.validation_errors().unwrap();
        assert_eq!(fields.get("name"), ["can't be blank".to_string()]);
        assert!(fields.get("email").is_empty());
    }

    #[test]
    fn test_not_found() {
        assert!(Error::NotFound("relationship").is_not_found());
        assert!(Error::Database(diesel::result::Error::NotFound).is_not_found());
        assert!(!Error::InvalidCredentials.is_not_found());
    }
}
