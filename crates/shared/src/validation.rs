//! Common validation and normalization utilities.

use validator::{ValidationError, ValidationErrors};

/// Maximum length of a location-change reason.
pub const MAX_REASON_LENGTH: usize = 500;

/// Maximum length of free-form notes on equipment.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Maximum length of an equipment name.
pub const MAX_NAME_LENGTH: usize = 100;

lazy_static::lazy_static! {
    /// Room codes and reader ids: letters, digits, dash and underscore.
    pub static ref ROOM_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^(?i)[A-Z0-9][A-Z0-9_-]{0,31}$").unwrap();
}

/// Normalizes an external identifier (serial number, asset tag, RFID tag,
/// room code, reader id): surrounding whitespace is dropped and the value is
/// uppercased.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Like [`normalize_identifier`], but maps missing or blank input to `None`.
pub fn normalize_optional_identifier(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_identifier).filter(|s| !s.is_empty())
}

/// Returns true when the value is empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validates the shape of a room code.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if ROOM_CODE_REGEX.is_match(code.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code may only contain letters, digits, '-' and '_'".into());
        Err(err)
    }
}

/// Validates that a free-text reason is present and not longer than
/// [`MAX_REASON_LENGTH`].
pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    if is_blank(reason) {
        let mut err = ValidationError::new("reason_required");
        err.message = Some("Reason is required".into());
        return Err(err);
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        let mut err = ValidationError::new("reason_length");
        err.message = Some(format!("Reason cannot exceed {} characters", MAX_REASON_LENGTH).into());
        return Err(err);
    }
    Ok(())
}

/// Flattens `validator` errors into a single human-readable message.
///
/// Fields are reported in alphabetical order so messages are stable.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  sn-001a "), "SN-001A");
        assert_eq!(normalize_identifier("ABC"), "ABC");
        assert_eq!(normalize_identifier(""), "");
    }

    #[test]
    fn test_normalize_optional_identifier() {
        assert_eq!(normalize_optional_identifier(None), None);
        assert_eq!(normalize_optional_identifier(Some("   ")), None);
        assert_eq!(
            normalize_optional_identifier(Some("tag-9")),
            Some("TAG-9".to_string())
        );
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_validate_room_code() {
        assert!(validate_room_code("LAB-101").is_ok());
        assert!(validate_room_code("lab_2").is_ok());
        assert!(validate_room_code("A").is_ok());
        assert!(validate_room_code("").is_err());
        assert!(validate_room_code("-A").is_err());
        assert!(validate_room_code("ROOM 1").is_err());
    }

    #[test]
    fn test_validate_room_code_error_message() {
        let err = validate_room_code("bad code").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Room code may only contain letters, digits, '-' and '_'"
        );
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("relocate for calibration").is_ok());
        assert_eq!(validate_reason("  ").unwrap_err().code, "reason_required");
        let long = "x".repeat(MAX_REASON_LENGTH + 1);
        assert_eq!(validate_reason(&long).unwrap_err().code, "reason_length");
        let exact = "x".repeat(MAX_REASON_LENGTH);
        assert!(validate_reason(&exact).is_ok());
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        #[validate(range(min = 1, max = 10, message = "out of range"))]
        count: i32,
    }

    #[test]
    fn test_describe_validation_errors_is_sorted() {
        let sample = Sample {
            name: String::new(),
            count: 42,
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(
            describe_validation_errors(&errors),
            "count: out of range, name: name is required"
        );
    }
}
