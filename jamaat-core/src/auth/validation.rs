//! Sign-in, sign-up, and profile form validation.

use crate::validation::{Collector, ValidationError};

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Display name length bounds, in characters.
pub const DISPLAY_NAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;

/// Length of a one-time passcode.
pub const OTP_LEN: usize = 6;

/// Loose email shape check: one `@`, a non-empty local part, and a dotted
/// domain without whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2
}

/// E.164: `+`, a non-zero leading digit, 8 to 15 digits total.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

/// Exactly six ASCII digits.
#[must_use]
pub fn is_valid_otp(code: &str) -> bool {
    code.len() == OTP_LEN && code.chars().all(|c| c.is_ascii_digit())
}

/// Validates the email + password form.
///
/// # Errors
///
/// Returns every invalid field.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    let mut errors = Collector::default();
    if !is_valid_email(email.trim()) {
        errors.push("email", "Please enter a valid email address");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    errors.finish()
}

/// Validates the email field of the magic code form.
///
/// # Errors
///
/// Returns an `email` field error.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::single(
            "email",
            "Please enter a valid email address",
        ))
    }
}

/// Validates the phone field.
///
/// # Errors
///
/// Returns a `phone` field error.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::single(
            "phone",
            "Enter the number with country code, e.g. +14165550100",
        ))
    }
}

/// Validates a one-time passcode.
///
/// # Errors
///
/// Returns a `code` field error.
pub fn validate_otp(code: &str) -> Result<(), ValidationError> {
    if is_valid_otp(code.trim()) {
        Ok(())
    } else {
        Err(ValidationError::single("code", "Enter the 6-digit code"))
    }
}

/// Validates a display name after trimming.
///
/// # Errors
///
/// Returns a `displayName` field error.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if DISPLAY_NAME_LEN.contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::single(
            "displayName",
            format!(
                "Name must be between {} and {} characters",
                DISPLAY_NAME_LEN.start(),
                DISPLAY_NAME_LEN.end()
            ),
        ))
    }
}
