use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,24}$").expect("valid regex"));

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Username can have only letters, numbers and underscore, 3 to 24 characters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::validate_username;

    #[test]
    fn username_rules() {
        assert!(validate_username("some_user1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("has-dash").is_err());
    }
}
