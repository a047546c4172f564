//! Menu id and open-command validation

/// Validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Menu id cannot be empty")]
    EmptyId,

    #[error("Menu id is too long (maximum {max} characters)")]
    IdTooLong { max: usize },

    #[error("Menu id contains invalid characters: {chars}")]
    InvalidIdCharacters { chars: String },

    #[error("Menu id is reserved")]
    ReservedId,

    #[error("Open command cannot be empty")]
    EmptyCommand,

    #[error("Open command is too long (maximum {max} characters)")]
    CommandTooLong { max: usize },

    #[error("Open command label contains invalid characters: {label}")]
    InvalidCommandLabel { label: String },
}

pub const MAX_MENU_ID_LENGTH: usize = 64;
pub const MAX_COMMAND_LENGTH: usize = 128;

/// Validate a menu id. Ids double as file stems, so only filename-safe
/// characters are allowed. Case is preserved; lookups lowercase separately.
pub fn validate_menu_id(id: &str) -> Result<String, ValidationError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if trimmed.chars().count() > MAX_MENU_ID_LENGTH {
        return Err(ValidationError::IdTooLong {
            max: MAX_MENU_ID_LENGTH,
        });
    }
    let invalid: String = trimmed
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidIdCharacters { chars: invalid });
    }
    if trimmed.chars().all(|c| c == '.') {
        return Err(ValidationError::ReservedId);
    }
    Ok(trimmed.to_string())
}

/// Validate one `open_command` entry and return it trimmed.
///
/// Only the label (first word) is restricted; the remainder is matched
/// literally against what the player typed.
pub fn validate_open_command(command: &str) -> Result<String, ValidationError> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyCommand);
    }
    if trimmed.chars().count() > MAX_COMMAND_LENGTH {
        return Err(ValidationError::CommandTooLong {
            max: MAX_COMMAND_LENGTH,
        });
    }
    let label = trimmed.split_whitespace().next().unwrap_or_default();
    let label_ok = label
        .trim_start_matches('/')
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'));
    if !label_ok || label.trim_start_matches('/').is_empty() {
        return Err(ValidationError::InvalidCommandLabel {
            label: label.to_string(),
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidCommandLabel {
            label: label.to_string(),
        });
    }
    Ok(trimmed.trim_start_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_ids() {
        assert_eq!(validate_menu_id(" shop_main ").unwrap(), "shop_main");
        assert_eq!(validate_menu_id("v1.2-beta").unwrap(), "v1.2-beta");
        assert_eq!(validate_menu_id("").unwrap_err(), ValidationError::EmptyId);
        assert!(matches!(
            validate_menu_id("../etc"),
            Err(ValidationError::InvalidIdCharacters { .. })
        ));
        assert_eq!(validate_menu_id("..").unwrap_err(), ValidationError::ReservedId);
        assert!(matches!(
            validate_menu_id(&"a".repeat(65)),
            Err(ValidationError::IdTooLong { max: 64 })
        ));
    }

    #[test]
    fn open_commands() {
        assert_eq!(validate_open_command("/shop").unwrap(), "shop");
        assert_eq!(validate_open_command("gui  shop ").unwrap(), "gui  shop");
        assert_eq!(validate_open_command("   ").unwrap_err(), ValidationError::EmptyCommand);
        assert!(validate_open_command("sh$op now").is_err());
        assert!(validate_open_command("/").is_err());
        assert!(validate_open_command("shop\u{7}").is_err());
    }
}
