//! Custom field validators used with `#[validate(custom(function = ...))]`.

use std::borrow::Cow;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// School codes: 2 to 50 characters of `A-Z`, `0-9`, `_` or `-`.
pub fn validate_school_code(code: &str) -> Result<(), ValidationError> {
    let valid_len = (2..=50).contains(&code.len());
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(invalid(
            "school_code",
            "Code must be 2-50 characters of uppercase letters, digits, '_' or '-'",
        ))
    }
}

/// Course codes are upper-cased on write, so lower case is accepted here.
pub fn validate_course_code(code: &str) -> Result<(), ValidationError> {
    let valid_len = (2..=50).contains(&code.trim().len());
    let valid_chars = code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(invalid(
            "course_code",
            "Code must be 2-50 characters of letters, digits, '_' or '-'",
        ))
    }
}

/// IANA-style `Area/Location` names, e.g. `Africa/Lagos` or
/// `America/Argentina/Buenos_Aires`.
pub fn validate_timezone(tz: &str) -> Result<(), ValidationError> {
    let mut parts = tz.split('/');
    let area = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let segment_ok = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'))
    };

    if tz.len() <= 50 && segment_ok(area) && !rest.is_empty() && rest.into_iter().all(segment_ok) {
        Ok(())
    } else {
        Err(invalid("timezone", "Timezone must look like Area/Location"))
    }
}

/// ISO 4217 style: three upper-case letters.
pub fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(invalid("currency", "Currency must be a 3-letter upper-case code"))
    }
}

pub const PRICING_TYPES: [&str; 2] = ["one-time", "subscription"];

pub fn validate_pricing_type(pricing_type: &str) -> Result<(), ValidationError> {
    if PRICING_TYPES.contains(&pricing_type) {
        Ok(())
    } else {
        Err(invalid(
            "pricing_type",
            "Pricing type must be 'one-time' or 'subscription'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_codes() {
        assert!(validate_school_code("LAGOS-HS_01").is_ok());
        assert!(validate_school_code("A").is_err());
        assert!(validate_school_code("lagos").is_err());
        assert!(validate_school_code("HAS SPACE").is_err());
        assert!(validate_school_code(&"X".repeat(51)).is_err());
    }

    #[test]
    fn course_codes_accept_lower_case() {
        assert!(validate_course_code("math-101").is_ok());
        assert!(validate_course_code("M").is_err());
        assert!(validate_course_code("math 101").is_err());
    }

    #[test]
    fn timezones() {
        assert!(validate_timezone("Africa/Lagos").is_ok());
        assert!(validate_timezone("America/Argentina/Buenos_Aires").is_ok());
        assert!(validate_timezone("Etc/GMT+1").is_ok());
        assert!(validate_timezone("UTC").is_err());
        assert!(validate_timezone("Europe/").is_err());
        assert!(validate_timezone("/London").is_err());
    }

    #[test]
    fn currencies() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("US").is_err());
    }

    #[test]
    fn pricing_types() {
        assert!(validate_pricing_type("one-time").is_ok());
        assert!(validate_pricing_type("subscription").is_ok());
        assert!(validate_pricing_type("monthly").is_err());
    }
}
