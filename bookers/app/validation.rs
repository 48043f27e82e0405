//! Field validators shared by the entity modules.
//!
//! Lengths are counted in characters, not bytes.

use crate::error::ValidationErrors;

pub const NAME_LENGTH: (usize, usize) = (2, 20);
pub const INTRODUCTION_MAX: usize = 50;
pub const PASSWORD_LENGTH: (usize, usize) = (6, 128);
pub const BOOK_BODY_MAX: usize = 200;

pub fn length(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    min: Option<usize>,
    max: Option<usize>,
) {
    let len = value.chars().count();
    if let Some(min) = min {
        if len < min {
            errors.add(field, format!("is too short (minimum is {} characters)", min));
            return;
        }
    }
    if let Some(max) = max {
        if len > max {
            errors.add(field, format!("is too long (maximum is {} characters)", max));
        }
    }
}

pub fn presence(errors: &mut ValidationErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
        false
    } else {
        true
    }
}

/// Emails are stored and looked up trimmed and lowercased.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Same shape the authentication layer accepts: one `@`, something on both
/// sides, no whitespace.
pub fn email(errors: &mut ValidationErrors, value: &str) {
    if !presence(errors, "email", value) {
        return;
    }
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add("email", "is invalid");
    }
}

pub fn password(errors: &mut ValidationErrors, value: &str) {
    if !presence(errors, "password", value) {
        return;
    }
    let (min, max) = PASSWORD_LENGTH;
    length(errors, "password", value, Some(min), Some(max));
}

pub fn name(errors: &mut ValidationErrors, value: &str) {
    let (min, max) = NAME_LENGTH;
    length(errors, "name", value, Some(min), Some(max));
}

pub fn introduction(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(value) = value {
        length(errors, "introduction", value, None, Some(INTRODUCTION_MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        for (input, ok) in &[
            ("a", false),
            ("ab", true),
            ("a".repeat(20).as_str(), true),
            ("a".repeat(21).as_str(), false),
            ("", false),
        ] {
            let mut errors = ValidationErrors::new();
            name(&mut errors, input);
            assert_eq!(errors.is_empty(), *ok, "name {:?}", input);
        }
    }

    #[test]
    fn test_name_counts_characters() {
        let mut errors = ValidationErrors::new();
        // 20 characters, 60 bytes
        name(&mut errors, &"本".repeat(20));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_introduction() {
        let mut errors = ValidationErrors::new();
        introduction(&mut errors, None);
        introduction(&mut errors, Some(""));
        introduction(&mut errors, Some(&"x".repeat(50)));
        assert!(errors.is_empty());
        introduction(&mut errors, Some(&"x".repeat(51)));
        assert_eq!(
            errors.get("introduction"),
            ["is too long (maximum is 50 characters)".to_string()]
        );
    }

    #[test]
    fn test_email() {
        for (input, ok) in &[
            ("guest@example.com", true),
            ("a@b", true),
            ("", false),
            ("nobody", false),
            ("@example.com", false),
            ("a@", false),
            ("a@b@c", false),
            ("a b@example.com", false),
        ] {
            let mut errors = ValidationErrors::new();
            email(&mut errors, input);
            assert_eq!(errors.is_empty(), *ok, "email {:?}", input);
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM\n"), "alice@example.com");
        assert_eq!(normalize_email("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn test_password() {
        let mut errors = ValidationErrors::new();
        password(&mut errors, "12345");
        assert_eq!(
            errors.get("password"),
            ["is too short (minimum is 6 characters)".to_string()]
        );
        let mut errors = ValidationErrors::new();
        password(&mut errors, "123456");
        assert!(errors.is_empty());
    }
}
