//! Input validation for API requests.
//!
//! Field checks return `Err(message)` so handlers can collect them with
//! the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{PhoneInput, Role};

lazy_static! {
    /// Letters only, at least one
    static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-z]+$").unwrap();

    /// local@domain.tld with no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$"
    ).unwrap();
}

const MIN_PASSWORD_LEN: usize = 6;

/// Validate a first or last name
pub fn validate_name(name: &str, label: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} is required", label));
    }

    if !NAME_REGEX.is_match(name) {
        return Err(format!("{} must contain only letters", label));
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Valid email is required".to_string());
    }

    Ok(())
}

/// Parse a submitted phone number into its stored numeric form
pub fn parse_phone(phone: &PhoneInput) -> Result<i64, String> {
    let number = match phone {
        PhoneInput::Number(n) => *n,
        PhoneInput::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err("Phone number is required".to_string());
            }
            if !s.chars().all(|c| c.is_ascii_digit()) {
                return Err("Phone number must be numeric".to_string());
            }
            s.parse::<i64>()
                .map_err(|_| "Phone number is too long".to_string())?
        }
    };

    if number <= 0 {
        return Err("Phone number must be numeric".to_string());
    }

    Ok(number)
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_uppercase {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !has_lowercase {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }
    if !has_special {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

/// Parse an optional role, defaulting to `Admin`
pub fn parse_role(role: Option<&str>) -> Result<Role, String> {
    match role {
        None | Some("") => Ok(Role::default()),
        Some(r) => r
            .parse::<Role>()
            .map_err(|_| "Role must be either Admin or SuperAdmin".to_string()),
    }
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Jane", "First name").is_ok());
        assert!(validate_name("McDonald", "Last name").is_ok());

        assert!(validate_name("", "First name").is_err());
        assert!(validate_name("   ", "First name").is_err());
        assert!(validate_name("Jane2", "First name").is_err());
        assert!(validate_name("Mary Ann", "First name").is_err());
        assert_eq!(
            validate_name("J4ne", "First name").unwrap_err(),
            "First name must contain only letters"
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane.doe+tag@mail.example.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("jane").is_err());
        assert!(validate_email("jane@").is_err());
        assert!(validate_email("jane@example").is_err());
        assert!(validate_email("ja ne@example.com").is_err());
    }

    #[test]
    fn test_parse_phone() {
        assert_eq!(parse_phone(&PhoneInput::Number(5550100)).unwrap(), 5550100);
        assert_eq!(
            parse_phone(&PhoneInput::Text("5550100".to_string())).unwrap(),
            5550100
        );

        assert!(parse_phone(&PhoneInput::Number(0)).is_err());
        assert!(parse_phone(&PhoneInput::Number(-5)).is_err());
        assert!(parse_phone(&PhoneInput::Text("".to_string())).is_err());
        assert!(parse_phone(&PhoneInput::Text("555-0100".to_string())).is_err());
        assert!(parse_phone(&PhoneInput::Text("99999999999999999999999".to_string())).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret1!").is_ok());
        assert!(validate_password("aB3$xy").is_ok());

        assert!(validate_password("").is_err());
        assert!(validate_password("aB3$x").is_err()); // too short
        assert!(validate_password("secret1!").is_err()); // no uppercase
        assert!(validate_password("SECRET1!").is_err()); // no lowercase
        assert!(validate_password("Secret!!").is_err()); // no digit
        assert!(validate_password("Secret12").is_err()); // no symbol
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), Role::Admin);
        assert_eq!(parse_role(Some("")).unwrap(), Role::Admin);
        assert_eq!(parse_role(Some("SuperAdmin")).unwrap(), Role::SuperAdmin);
        assert!(parse_role(Some("Root")).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "User id").is_ok());
        assert!(validate_uuid("", "User id").is_err());
        assert!(validate_uuid("not-a-uuid", "User id").is_err());
    }
}
