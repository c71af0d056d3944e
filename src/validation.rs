use uuid::Uuid;

use crate::errors::ServiceError;

/// 8,000 characters keeps the post-encryption envelope (roughly 1.77x the
/// plaintext after JSON number-array framing) under the backend row-size
/// ceiling.
pub const MAX_CONTENT_LEN: usize = 8000;

/// Validates and sanitizes note content before anything touches the
/// backend. Returns the trimmed, null-stripped text that actually gets
/// stored.
pub fn validate_content(content: &str) -> Result<String, ServiceError> {
    let sanitized: String = content.chars().filter(|c| *c != '\0').collect();
    let trimmed = sanitized.trim();

    if trimmed.is_empty() {
        return Err(ServiceError::Validation("note content cannot be empty"));
    }

    let length = trimmed.chars().count();
    if length > MAX_CONTENT_LEN {
        return Err(ServiceError::Validation(
            "note content exceeds maximum length of 8,000 characters",
        ));
    }

    let control_chars = trimmed
        .chars()
        .filter(|c| c.is_control() && *c != '\n' && *c != '\t' && *c != '\r')
        .count();
    if control_chars * 10 > length {
        return Err(ServiceError::Validation(
            "note contains too many control characters",
        ));
    }

    Ok(trimmed.to_string())
}

/// Note ids are hyphenated UUIDs; anything else is rejected locally
/// without a round trip to the backend.
pub fn validate_id(id: &str) -> Result<(), ServiceError> {
    if id.len() == 36 && Uuid::parse_str(id).is_ok() {
        Ok(())
    } else {
        Err(ServiceError::Validation("malformed note id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_content_at_the_limit() {
        let content = "a".repeat(MAX_CONTENT_LEN);
        assert_eq!(validate_content(&content).unwrap(), content);
    }

    #[test]
    fn rejects_content_over_the_limit() {
        let content = "a".repeat(MAX_CONTENT_LEN + 1);
        assert!(matches!(
            validate_content(&content),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_and_whitespace_only_content() {
        assert!(validate_content("").is_err());
        assert!(validate_content("   \n\t  ").is_err());
    }

    #[test]
    fn strips_null_bytes() {
        assert_eq!(validate_content("he\0llo").unwrap(), "hello");
    }

    #[test]
    fn rejects_mostly_control_characters() {
        let content = "ab\x01\x02\x03\x04\x05";
        assert!(validate_content(content).is_err());
    }

    #[test]
    fn newlines_and_tabs_are_not_counted_as_control_noise() {
        let content = "line one\nline two\n\tindented";
        assert!(validate_content(content).is_ok());
    }

    #[test]
    fn accepts_hyphenated_uuid_ids() {
        let id = Uuid::new_v4().to_string();
        assert!(validate_id(&id).is_ok());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(validate_id("").is_err());
        assert!(validate_id("not-a-uuid").is_err());
        assert!(validate_id("'; DROP TABLE notes; --").is_err());
        // unhyphenated form is not a valid share-link id
        assert!(validate_id(&Uuid::new_v4().simple().to_string()).is_err());
    }
}
