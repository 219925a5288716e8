//! Input validation for contact and device fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Invalid phone number format.
    InvalidPhone(String),
    /// Invalid hardware identifier.
    InvalidDeviceMac(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::InvalidPhone(msg) => write!(f, "Invalid phone number: {}", msg),
            ValidationError::InvalidDeviceMac(msg) => write!(f, "Invalid device MAC: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// E.164 allows at most 15 digits.
pub const MAX_PHONE_DIGITS: usize = 15;

/// Shortest national number we accept.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Validate an email address (basic format check).
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail(
            "must contain an @ symbol".to_string(),
        ));
    };

    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail(
            "must be of the form local@domain".to_string(),
        ));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail(
            "domain must contain an inner dot".to_string(),
        ));
    }

    Ok(())
}

/// Validate an E.164 phone number (`+` followed by digits).
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Empty("phone".to_string()));
    }

    let Some(digits) = phone.strip_prefix('+') else {
        return Err(ValidationError::InvalidPhone(
            "must start with '+' and country code".to_string(),
        ));
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone(
            "must contain only digits after '+'".to_string(),
        ));
    }

    if digits.len() < MIN_PHONE_DIGITS || digits.len() > MAX_PHONE_DIGITS {
        return Err(ValidationError::InvalidPhone(format!(
            "expected {}-{} digits, got {}",
            MIN_PHONE_DIGITS,
            MAX_PHONE_DIGITS,
            digits.len()
        )));
    }

    Ok(())
}

/// Normalize a hardware identifier to `AA:BB:CC:DD:EE:FF`.
///
/// Accepts colon, dash or no separators, in any case.
pub fn normalize_device_mac(mac: &str) -> Result<String, ValidationError> {
    let mac = mac.trim();

    if mac.is_empty() {
        return Err(ValidationError::Empty("device_mac".to_string()));
    }

    let hex: String = mac.chars().filter(|c| *c != ':' && *c != '-').collect();

    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidDeviceMac(format!(
            "'{}' is not a 6-byte hex identifier",
            mac
        )));
    }

    let upper = hex.to_ascii_uppercase();
    let pairs: Vec<&str> = (0..6).map(|i| &upper[i * 2..i * 2 + 2]).collect();
    Ok(pairs.join(":"))
}
