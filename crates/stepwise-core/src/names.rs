use thiserror::Error;

pub const RESET_STEP: &str = "reset";

const MAX_NAME_LENGTH: usize = 48;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name must be between 1 and 48 characters")]
    InvalidLength,
    #[error("name must start with a lowercase letter or digit")]
    InvalidFirstCharacter,
    #[error("name contains invalid character '{character}'")]
    InvalidCharacter { character: char },
    #[error("'reset' is reserved and cannot be used as a step name")]
    Reserved,
}

pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(NameError::InvalidLength);
    }

    let mut characters = name.chars();
    let Some(first) = characters.next() else {
        return Err(NameError::InvalidLength);
    };

    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return Err(NameError::InvalidFirstCharacter);
    }

    for character in characters {
        if is_name_character(character) {
            continue;
        }

        return Err(NameError::InvalidCharacter { character });
    }

    Ok(())
}

pub fn validate_step_name(name: &str) -> Result<(), NameError> {
    validate_name(name)?;

    if name == RESET_STEP {
        return Err(NameError::Reserved);
    }

    Ok(())
}

pub fn sanitize_session_name(value: &str) -> String {
    let mut output = String::with_capacity(value.len());

    for character in value.trim().chars() {
        if is_name_character(character) {
            output.push(character);
        } else if character.is_ascii_uppercase() {
            output.push(character.to_ascii_lowercase());
        } else {
            output.push('-');
        }
    }

    if output.is_empty() {
        return "default".to_string();
    }

    output
}

fn is_name_character(character: char) -> bool {
    character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_' || character == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_name_accepts_valid_input() {
        assert!(validate_name("contact_1").is_ok());
        assert!(validate_name("a").is_ok());
        assert!(validate_name("no-degree").is_ok());
    }

    #[test]
    fn validate_name_rejects_invalid_input() {
        assert_eq!(validate_name("Contact"), Err(NameError::InvalidFirstCharacter));
        assert!(matches!(
            validate_name("contact/info"),
            Err(NameError::InvalidCharacter { character: '/' })
        ));
        assert_eq!(validate_name(""), Err(NameError::InvalidLength));
        assert_eq!(validate_name(&"a".repeat(49)), Err(NameError::InvalidLength));
    }

    #[test]
    fn validate_step_name_reserves_reset() {
        assert_eq!(validate_step_name("reset"), Err(NameError::Reserved));
        assert!(validate_step_name("resets").is_ok());
        assert!(validate_name("reset").is_ok());
    }

    #[test]
    fn sanitize_session_name_normalizes_characters() {
        assert_eq!(sanitize_session_name("Alice Smith"), "alice-smith");
        assert_eq!(sanitize_session_name("browser_42"), "browser_42");
        assert_eq!(sanitize_session_name("   "), "default");
    }
}
