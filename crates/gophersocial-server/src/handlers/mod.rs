//! Route handlers.
//!
//! Handlers stay thin: they validate the payload, call the store and render
//! the result. Admission and authorization happen in [`crate::middleware`].

pub mod auth;
pub mod feed;
pub mod health;
pub mod posts;
pub mod users;

use crate::error::{ApiError, ApiResult};

/// Fails unless `value` has between `min` and `max` characters.
fn check_len(field: &str, value: &str, min: usize, max: usize) -> ApiResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(if min == 1 {
            ApiError::bad_request(format!("{field} is required"))
        } else {
            ApiError::bad_request(format!("{field} must be at least {min} characters"))
        });
    }
    if len > max {
        return Err(ApiError::bad_request(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Loose address check: one `@` with something on both sides and a dot in
/// the domain.
fn check_email(value: &str) -> ApiResult<()> {
    check_len("email", value, 1, 255)?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("email must be a valid address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(check_len("title", "", 1, 100).is_err());
        assert!(check_len("title", "ok", 1, 100).is_ok());
        assert!(check_len("title", &"x".repeat(101), 1, 100).is_err());
        assert_eq!(
            check_len("password", "ab", 3, 72).unwrap_err().to_string(),
            "password must be at least 3 characters"
        );
    }

    #[test]
    fn test_check_email() {
        assert!(check_email("gopher@example.com").is_ok());
        assert!(check_email("gopher").is_err());
        assert!(check_email("@example.com").is_err());
        assert!(check_email("gopher@localhost").is_err());
        assert!(check_email("a@b@c.com").is_err());
    }
}
