//! Password strength rules for new passwords.

use serde::Serialize;

pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Result of a strength check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub valid: bool,
    pub message: &'static str,
}

/// Check a candidate password.
///
/// Rules are applied in order and the first failure is reported.
pub fn check_password_strength(password: &str) -> PasswordStrength {
    let failure = if password.chars().count() < PASSWORD_MIN_LENGTH {
        Some("Password must be at least 8 characters")
    } else if !password.chars().any(|c| c.is_alphabetic()) {
        Some("Password must include at least one letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must include at least one number")
    } else {
        None
    };

    match failure {
        Some(message) => PasswordStrength {
            valid: false,
            message,
        },
        None => PasswordStrength {
            valid: true,
            message: "Password strength: Good",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        let result = check_password_strength("ab1");
        assert!(!result.valid);
        assert_eq!(result.message, "Password must be at least 8 characters");
    }

    #[test]
    fn test_needs_letter() {
        let result = check_password_strength("12345678");
        assert!(!result.valid);
        assert_eq!(result.message, "Password must include at least one letter");
    }

    #[test]
    fn test_needs_number() {
        let result = check_password_strength("abcdefgh");
        assert!(!result.valid);
        assert_eq!(result.message, "Password must include at least one number");
    }

    #[test]
    fn test_good() {
        let result = check_password_strength("hunter2hunter");
        assert!(result.valid);
        assert_eq!(result.message, "Password strength: Good");
    }
}
