// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates that a latitude is within [-90, 90]
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&lat) || lat.is_nan() {
        Err(ValidationError::new("latitude_out_of_range"))
    } else {
        Ok(())
    }
}

/// Validates that a longitude is within [-180, 180]
pub fn validate_longitude(lng: f64) -> Result<(), ValidationError> {
    if !(-180.0..=180.0).contains(&lng) || lng.is_nan() {
        Err(ValidationError::new("longitude_out_of_range"))
    } else {
        Ok(())
    }
}

fn nit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Digits with an optional dash before the check digit (which may be K),
    // or the generic consumer marker CF
    RE.get_or_init(|| Regex::new(r"^(?i)(CF|\d{4,8}-?[\dK])$").unwrap())
}

/// Validates a tax identification number as printed on receipts
pub fn validate_nit(nit: &str) -> Result<(), ValidationError> {
    if nit_regex().is_match(nit.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_nit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_bounds() {
        assert!(validate_latitude(14.6349).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(90.0001).is_err());
        assert!(validate_latitude(f64::NAN).is_err());
    }

    #[test]
    fn test_longitude_bounds() {
        assert!(validate_longitude(-90.5069).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.5).is_err());
    }

    #[test]
    fn test_nit_formats() {
        assert!(validate_nit("1234567-8").is_ok());
        assert!(validate_nit("12345678").is_ok());
        assert!(validate_nit("765432-K").is_ok());
        assert!(validate_nit("CF").is_ok());
        assert!(validate_nit("cf").is_ok());
        assert!(validate_nit("12-34").is_err());
        assert!(validate_nit("hello").is_err());
    }
}
